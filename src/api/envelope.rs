//! Wire envelope shared by every backend response.
//!
//! Success: `{"success": true, "message": "...", "data": ...}`.
//! Failure: `{"success": false, "error_code": 401, "message": "..."}`, with
//! field errors under `data.errors[]` when the message is
//! [`VALIDATION_ERROR_MESSAGE`].

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(test)]
#[path = "envelope_test.rs"]
mod envelope_test;

/// Messages the backend uses to reject an access token that a refresh can fix.
pub const EXPIRED_CREDENTIAL_MESSAGES: [&str; 2] = ["Token expired", "jwt malformed"];

pub const VALIDATION_ERROR_MESSAGE: &str = "Validation error!";

const FALLBACK_MESSAGE: &str = "Some error occurred";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// One entry of `data.errors[]` in a validation failure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldError {
    pub msg: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(error_code: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            error_code,
            message: message.into(),
            data: None,
        }
    }

    pub fn is_expired_credential(&self) -> bool {
        EXPIRED_CREDENTIAL_MESSAGES.contains(&self.message.as_str())
    }

    pub fn is_validation_error(&self) -> bool {
        self.message == VALIDATION_ERROR_MESSAGE
    }

    /// Field errors nested in a validation failure. Empty for any other error.
    pub fn validation_errors(&self) -> Vec<FieldError> {
        if !self.is_validation_error() {
            return Vec::new();
        }

        self.data
            .as_ref()
            .and_then(|data| data.get("errors"))
            .and_then(|errors| serde_json::from_value(errors.clone()).ok())
            .unwrap_or_default()
    }

    pub fn display_message(&self) -> String {
        if self.is_validation_error() {
            return self
                .validation_errors()
                .into_iter()
                .next()
                .map(|e| e.msg)
                .unwrap_or_else(|| "Validation error".to_string());
        }

        if self.message.is_empty() {
            FALLBACK_MESSAGE.to_string()
        } else {
            self.message.clone()
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    data: Option<Value>,
}

/// A response body interpreted as one of the two envelope variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Success(Value),
    Failure(ErrorEnvelope),
}

/// Interpret a raw HTTP answer. A body without a `success` flag is judged by
/// the status code; an empty 2xx body counts as success with `null` data.
pub fn parse_reply(status: u16, body: &str) -> Result<Reply, ApiError> {
    let status_ok = (200..300).contains(&status);

    if body.trim().is_empty() {
        return if status_ok {
            Ok(Reply::Success(Value::Null))
        } else {
            Err(ApiError::InvalidResponse(format!(
                "HTTP {status} with empty body"
            )))
        };
    }

    let raw: RawEnvelope = serde_json::from_str(body).map_err(|e| {
        ApiError::InvalidResponse(format!("HTTP {status}: body is not an envelope: {e}"))
    })?;

    if raw.success.unwrap_or(status_ok) {
        Ok(Reply::Success(raw.data.unwrap_or(Value::Null)))
    } else {
        Ok(Reply::Failure(ErrorEnvelope {
            error_code: raw.error_code.or(Some(status)),
            message: raw.message.unwrap_or_default(),
            data: raw.data,
        }))
    }
}
