use crate::api::envelope::ErrorEnvelope;
use crate::validation::ValidationErrors;
use thiserror::Error;

/// Outcome of a failed gateway call.
///
/// Backend failures keep the envelope the server sent so callers can show
/// its message or inspect nested validation errors.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    /// The access token was rejected and could not be renewed. Carries the
    /// envelope of the original request, not the refresh failure.
    #[error("Unauthenticated: {}", .0.message)]
    Unauthenticated(ErrorEnvelope),

    #[error("{}", .0.message)]
    Passthrough(ErrorEnvelope),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn envelope(&self) -> Option<&ErrorEnvelope> {
        match self {
            ApiError::Unauthenticated(envelope) | ApiError::Passthrough(envelope) => Some(envelope),
            _ => None,
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, ApiError::Unauthenticated(_))
    }

    /// Message suitable for showing to a user.
    pub fn user_message(&self) -> String {
        match self.envelope() {
            Some(envelope) => envelope.display_message(),
            None => self.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("This command requires an administrator account")]
    Forbidden,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Result of a single backend operation.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
