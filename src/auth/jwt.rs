use crate::api::endpoints::Role;
use crate::error::{ClientError, Result};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

#[cfg(test)]
#[path = "jwt_test.rs"]
mod jwt_test;

/// Backends name the subject differently; each spelling gets its own slot so
/// a payload carrying several of them still decodes.
#[derive(Debug, Default, Deserialize)]
struct SubjectKeys {
    #[serde(default, rename = "_id")]
    mongo_id: Option<String>,
    #[serde(default, rename = "userId")]
    camel: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AccessClaims {
    #[serde(flatten)]
    subject: SubjectKeys,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
}

impl AccessClaims {
    /// First present of `_id`, `userId`, `id`, `user_id`.
    pub fn user_id(&self) -> Option<&str> {
        let keys = &self.subject;
        [&keys.mongo_id, &keys.camel, &keys.id, &keys.user_id]
            .into_iter()
            .find_map(|key| key.as_deref())
    }
}

/// Access token with its payload read but not verified; the backend remains
/// the only judge of validity.
pub struct AccessToken {
    pub token: String,
    pub claims: AccessClaims,
}

impl AccessToken {
    pub fn from_string(token: String) -> Result<Self> {
        let parts: Vec<&str> = token.split('.').collect();
        let [_, payload, _] = parts.as_slice() else {
            return Err(ClientError::InvalidToken(
                "expected three dot-separated parts".to_string(),
            ));
        };

        let decoded = general_purpose::URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| ClientError::InvalidToken(format!("payload is not base64: {e}")))?;

        let claims: AccessClaims = serde_json::from_slice(&decoded)?;

        Ok(AccessToken { token, claims })
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims
            .exp
            .and_then(|exp| DateTime::<Utc>::from_timestamp(exp, 0))
    }

    /// Unknown expiry counts as not expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at().is_some_and(|at| at <= Utc::now())
    }

    pub fn expires_in(&self) -> Option<Duration> {
        self.expires_at().map(|at| at - Utc::now())
    }
}
