//! Compile-time defaults. The API endpoint is normally overridden through
//! the settings file or the environment.

pub const APP_NAME: &str = "referral-client";

/// Endpoint configuration module
pub mod endpoints {
    /// Base URL of the REST API, including the `/api` prefix
    pub const API: &str = "http://localhost:8000/api";
}

/// Environment variable holding the full API URL
pub const API_ENDPOINT_ENV: &str = "REFERRAL_API_ENDPOINT";

/// Environment variable holding the backend root; `/api` is appended
pub const BACKEND_BASE_URL_ENV: &str = "REFERRAL_BE_BASE_URL";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;
