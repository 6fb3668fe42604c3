pub mod endpoints;
pub mod envelope;
pub mod gateway;
pub mod request;
pub mod transport;

#[cfg(test)]
pub(crate) mod scripted_transport;

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use crate::auth::session::SessionStore;
use crate::auth::SessionExpiryHandler;
use crate::error::{ApiError, ApiResult};
use endpoints::*;
use gateway::Gateway;
use log::debug;
use request::ApiRequest;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use transport::Transport;

/// Typed operations of the referral backend.
///
/// Every method goes through the same [`Gateway`], so each one gets bearer
/// authentication and the single refresh-and-retry on an expired token.
pub struct ReferralApi {
    gateway: Gateway,
}

impl ReferralApi {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: String,
        session: SessionStore,
        expiry: Arc<dyn SessionExpiryHandler>,
    ) -> Self {
        ReferralApi {
            gateway: Gateway::new(transport, base_url, session, expiry),
        }
    }

    pub fn base_url(&self) -> &str {
        self.gateway.base_url()
    }

    pub fn session(&self) -> &SessionStore {
        self.gateway.session()
    }

    pub async fn login(&self, request: &LoginRequest) -> ApiResult<LoginData> {
        self.fetch(ApiRequest::post("users/login").json(request)?)
            .await
    }

    pub async fn register(&self, request: &RegisterRequest) -> ApiResult<RegisterData> {
        let data: Option<RegisterData> = self
            .fetch(ApiRequest::post("users/verify-invitation").json(request)?)
            .await?;
        Ok(data.unwrap_or_default())
    }

    pub async fn verify_otp(&self, request: &OtpRequest) -> ApiResult<TokenPair> {
        self.fetch(ApiRequest::post("users/verify-otp").json(request)?)
            .await
    }

    pub async fn profile(&self) -> ApiResult<Profile> {
        self.fetch(ApiRequest::get("users/me")).await
    }

    pub async fn invite_users(&self, request: &InviteRequest) -> ApiResult<()> {
        self.send(ApiRequest::post("users/invite").json(request)?)
            .await
    }

    pub async fn referral_tree(&self) -> ApiResult<ReferralNode> {
        self.fetch(ApiRequest::get("users/tree")).await
    }

    /// Total commission earned; `user_id` selects another user (admin view).
    pub async fn total_commission(&self, user_id: Option<&str>) -> ApiResult<f64> {
        self.fetch(ApiRequest::get("commission/total").optional_query("id", user_id))
            .await
    }

    pub async fn balance(&self, user_id: Option<&str>) -> ApiResult<f64> {
        self.fetch(ApiRequest::get("transaction/balance").optional_query("id", user_id))
            .await
    }

    pub async fn transactions(&self, page: PageRequest) -> ApiResult<Page<Transaction>> {
        self.fetch(paged(ApiRequest::get("transaction"), page))
            .await
    }

    pub async fn commissions(&self, page: PageRequest) -> ApiResult<Page<Commission>> {
        self.fetch(paged(ApiRequest::get("commission"), page))
            .await
    }

    pub async fn personal_details(&self) -> ApiResult<UserDetails> {
        self.fetch(ApiRequest::get("users/profile")).await
    }

    pub async fn update_user(&self, request: &UpdateUserRequest) -> ApiResult<()> {
        let path = format!("users/{}", urlencoding::encode(&request.id));
        self.send(ApiRequest::patch(path).json(request)?).await
    }

    pub async fn users(&self, page: PageRequest, search: Option<&str>) -> ApiResult<Page<User>> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        self.fetch(paged(ApiRequest::get("users"), page).optional_query("search", search))
            .await
    }

    pub async fn user_details(&self, user_id: &str) -> ApiResult<UserDetails> {
        let path = format!("users/{}", urlencoding::encode(user_id));
        self.fetch(ApiRequest::get(path)).await
    }

    pub async fn payout(&self, request: &PayoutRequest) -> ApiResult<()> {
        self.send(ApiRequest::post("payout").json(request)?).await
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        let data = self.gateway.execute(&request).await?;
        decode(&request.path, data)
    }

    async fn send(&self, request: ApiRequest) -> ApiResult<()> {
        self.gateway.execute(&request).await.map(|_| ())
    }
}

fn paged(request: ApiRequest, page: PageRequest) -> ApiRequest {
    request.query("skip", page.skip).query("limit", page.limit)
}

fn decode<T: DeserializeOwned>(path: &str, data: Value) -> ApiResult<T> {
    serde_json::from_value(data).map_err(|e| {
        debug!("Unexpected data shape from {path}: {e}");
        ApiError::InvalidResponse(format!("{path}: {e}"))
    })
}
