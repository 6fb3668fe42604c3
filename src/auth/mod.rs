pub mod jwt;
pub mod session;
pub mod token_store;

use crate::api::endpoints::{
    LoginRequest, OtpRequest, Profile, RegisterRequest, Role,
};
use crate::api::ReferralApi;
use crate::error::{ApiError, ClientError, Result};
use crate::validation;
use log::{error, info, warn};
use std::sync::Arc;

use self::jwt::AccessToken;
use self::session::SessionStore;

/// Called by the gateway when an expired session cannot be renewed.
/// Implementations must clear the persisted tokens before returning.
pub trait SessionExpiryHandler: Send + Sync {
    fn on_unrecoverable(&self);
}

/// Default expiry handling: wipe the stored tokens.
pub struct ClearSessionOnExpiry {
    session: SessionStore,
}

impl ClearSessionOnExpiry {
    pub fn new(session: SessionStore) -> Self {
        Self { session }
    }
}

impl SessionExpiryHandler for ClearSessionOnExpiry {
    fn on_unrecoverable(&self) {
        warn!("Session expired, please login again");
        if let Err(e) = self.session.clear() {
            error!("Failed to clear expired session: {e}");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated,
    /// The backend sent a one-time code; finish with [`AuthManager::verify_otp`].
    OtpRequired,
}

pub struct AuthManager {
    api: Arc<ReferralApi>,
    session: SessionStore,
}

impl AuthManager {
    pub fn new(api: Arc<ReferralApi>) -> Self {
        let session = api.session().clone();
        Self { api, session }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.access_token().is_some()
    }

    /// Claims of the stored access token, read without verification.
    pub fn access_claims(&self) -> Option<Result<AccessToken>> {
        self.session.access_token().map(AccessToken::from_string)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        validation::check(&request)?;

        let data = self.api.login(&request).await?;

        match data.token_pair() {
            Some(tokens) => {
                self.session.store_tokens(&tokens)?;
                info!("Logged in");
                Ok(LoginOutcome::Authenticated)
            }
            None => {
                info!("Login accepted, waiting for one-time code");
                Ok(LoginOutcome::OtpRequired)
            }
        }
    }

    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<()> {
        let otp = validation::otp(otp)?;

        let tokens = self
            .api
            .verify_otp(&OtpRequest {
                otp,
                email: email.trim().to_string(),
            })
            .await?;

        self.session.store_tokens(&tokens)?;
        info!("One-time code verified, session stored");
        Ok(())
    }

    /// Registers through an invitation PIN. Returns the server's message.
    pub async fn register(&self, request: &RegisterRequest) -> Result<Option<String>> {
        validation::check(request)?;
        let data = self.api.register(request).await?;
        info!("Registered {}", request.email);
        Ok(data.message)
    }

    pub fn logout(&self) -> Result<()> {
        self.session.clear()
    }

    /// Fails unless a session is stored.
    pub fn require_session(&self) -> Result<()> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(ClientError::AuthenticationRequired)
        }
    }

    /// Fetches the profile and checks its role.
    pub async fn require_role(&self, role: Role) -> Result<Profile> {
        self.require_session()?;

        let profile = self.api.profile().await?;
        if profile.role == role {
            Ok(profile)
        } else {
            warn!("{} required, profile has role {}", role, profile.role);
            Err(ClientError::Forbidden)
        }
    }
}

/// True when an error means the user has to log in again.
pub fn is_session_lost(error: &ClientError) -> bool {
    matches!(
        error,
        ClientError::AuthenticationRequired | ClientError::Api(ApiError::Unauthenticated(_))
    )
}
