//! Authenticated request gateway.
//!
//! Every backend call goes through [`Gateway::execute`]. The stored access
//! token is attached as a bearer credential; when the backend rejects it as
//! expired the gateway exchanges the refresh token once and replays the
//! original request with the new access token. If the exchange fails the
//! session is torn down and the caller receives the original error.
//!
//! Concurrent calls are not coordinated: each one that meets an expired
//! token runs its own refresh and the last token pair stored wins.

use super::envelope::{parse_reply, ErrorEnvelope, Reply};
use super::request::ApiRequest;
use super::transport::{Transport, TransportRequest};
use crate::auth::session::{SessionStore, TokenPair};
use crate::auth::SessionExpiryHandler;
use crate::error::{ApiError, ApiResult};
use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[cfg(test)]
#[path = "gateway_test.rs"]
mod gateway_test;

pub const REFRESH_TOKEN_PATH: &str = "users/refresh-token";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshTokenRequest<'a> {
    refresh_token: &'a str,
}

/// How a single attempt resolved.
#[derive(Debug)]
enum Outcome {
    Done(ApiResult<Value>),
    RetryAfterRefresh(ErrorEnvelope),
}

impl Outcome {
    fn from_reply(reply: Reply) -> Self {
        match reply {
            Reply::Success(data) => Outcome::Done(Ok(data)),
            Reply::Failure(envelope) if envelope.is_expired_credential() => {
                Outcome::RetryAfterRefresh(envelope)
            }
            Reply::Failure(envelope) => Outcome::Done(Err(ApiError::Passthrough(envelope))),
        }
    }
}

pub struct Gateway {
    transport: Arc<dyn Transport>,
    base_url: String,
    session: SessionStore,
    expiry: Arc<dyn SessionExpiryHandler>,
}

impl Gateway {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        session: SessionStore,
        expiry: Arc<dyn SessionExpiryHandler>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            session,
            expiry,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Runs one logical call with at most one refresh-and-retry cycle.
    pub async fn execute(&self, request: &ApiRequest) -> ApiResult<Value> {
        let access_token = self.session.access_token();
        let reply = self.dispatch(request, access_token.as_deref()).await?;

        let original = match Outcome::from_reply(reply) {
            Outcome::Done(result) => return result,
            Outcome::RetryAfterRefresh(envelope) => envelope,
        };

        info!(
            "Access token rejected on {} ({}), refreshing",
            request.path, original.message
        );

        let Some(tokens) = self.renew_tokens().await else {
            warn!("Session could not be renewed, clearing it");
            self.expiry.on_unrecoverable();
            return Err(ApiError::Unauthenticated(original));
        };

        if let Err(e) = self.session.store_tokens(&tokens) {
            error!("Failed to persist refreshed tokens: {e}");
        }

        // replayed once; a second expiry is handed back as-is
        match self
            .dispatch(request, Some(&tokens.access_token))
            .await?
        {
            Reply::Success(data) => Ok(data),
            Reply::Failure(envelope) => Err(ApiError::Passthrough(envelope)),
        }
    }

    async fn renew_tokens(&self) -> Option<TokenPair> {
        let Some(refresh_token) = self.session.refresh_token() else {
            warn!("No refresh token stored");
            return None;
        };

        let request = match ApiRequest::post(REFRESH_TOKEN_PATH).json(&RefreshTokenRequest {
            refresh_token: &refresh_token,
        }) {
            Ok(request) => request,
            Err(e) => {
                error!("Failed to build refresh request: {e}");
                return None;
            }
        };

        match self.dispatch(&request, None).await {
            Ok(Reply::Success(data)) => match serde_json::from_value::<TokenPair>(data) {
                Ok(tokens) => {
                    debug!("Received new token pair");
                    Some(tokens)
                }
                Err(e) => {
                    warn!("Refresh response did not contain a token pair: {e}");
                    None
                }
            },
            Ok(Reply::Failure(envelope)) => {
                warn!("Token refresh rejected: {}", envelope.message);
                None
            }
            Err(e) => {
                warn!("Token refresh failed: {e}");
                None
            }
        }
    }

    async fn dispatch(&self, request: &ApiRequest, bearer: Option<&str>) -> ApiResult<Reply> {
        let outbound = TransportRequest {
            method: request.method.clone(),
            url: request.url(&self.base_url),
            bearer_token: bearer.map(str::to_string),
            query: request.query.clone(),
            body: request.body.clone(),
        };

        let response = self
            .transport
            .send(outbound)
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        parse_reply(response.status, &response.body)
    }
}
