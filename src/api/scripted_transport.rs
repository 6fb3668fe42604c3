//! In-process transport double shared by the unit tests.

use super::transport::{Transport, TransportError, TransportRequest, TransportResponse};
use super::ReferralApi;
use crate::auth::session::SessionStore;
use crate::auth::ClearSessionOnExpiry;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub(crate) const BASE_URL: &str = "http://backend.test/api";

/// Answers requests from a fixed script and records what was sent
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    sent: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, status: u16, body: Value) -> Self {
        self.replies.lock().unwrap().push_back(Ok(TransportResponse {
            status,
            body: body.to_string(),
        }));
        self
    }

    /// A successful envelope carrying `data`.
    pub(crate) fn ok(self, data: Value) -> Self {
        self.reply(200, json!({ "success": true, "message": "ok", "data": data }))
    }

    pub(crate) fn fail(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(TransportError(message.to_string())));
        self
    }

    pub(crate) fn sent(&self) -> Vec<TransportRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn last(&self) -> TransportRequest {
        self.sent().pop().expect("nothing was sent")
    }

    pub(crate) fn refresh_calls(&self) -> usize {
        self.sent()
            .iter()
            .filter(|r| r.url.ends_with("/users/refresh-token"))
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.sent.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError("no scripted reply".to_string())))
    }
}

/// API client over `transport`, clearing `session` when it expires.
pub(crate) fn referral_api(transport: Arc<ScriptedTransport>, session: SessionStore) -> ReferralApi {
    ReferralApi::new(
        transport,
        BASE_URL.to_string(),
        session.clone(),
        Arc::new(ClearSessionOnExpiry::new(session)),
    )
}
