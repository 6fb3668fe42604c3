// Library side of referral-client; the CLI binary and the integration
// tests both build on it.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod validation;

pub use error::{ApiError, ApiResult, ClientError, Result};
