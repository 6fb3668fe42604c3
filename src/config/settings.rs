use crate::config::constants;
use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[cfg(test)]
#[path = "settings_test.rs"]
mod settings_test;

/// Where session tokens are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStorage {
    #[default]
    Keyring,
    File,
}

impl std::str::FromStr for TokenStorage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keyring" => Ok(TokenStorage::Keyring),
            "file" => Ok(TokenStorage::File),
            other => Err(format!("unknown token storage: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api_endpoint: Option<String>,
    #[serde(default)]
    pub token_storage: TokenStorage,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_request_timeout_secs() -> u64 {
    constants::DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_page_size() -> u32 {
    constants::DEFAULT_PAGE_SIZE
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_endpoint: None,
            token_storage: TokenStorage::default(),
            request_timeout_secs: default_request_timeout_secs(),
            page_size: default_page_size(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let settings = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            Self::default()
        };

        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the API endpoint, with support for environment variable override
    pub fn api_endpoint(&self) -> String {
        resolve_api_endpoint(
            std::env::var(constants::API_ENDPOINT_ENV).ok(),
            std::env::var(constants::BACKEND_BASE_URL_ENV).ok(),
            self.api_endpoint.as_deref(),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        let endpoint = self.api_endpoint();
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ClientError::InvalidConfiguration(format!(
                "API endpoint must be an http(s) URL: {endpoint}"
            )));
        }

        if self.request_timeout_secs < 1 {
            return Err(ClientError::InvalidConfiguration(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }

        if self.page_size == 0 || self.page_size > constants::MAX_PAGE_SIZE {
            return Err(ClientError::InvalidConfiguration(format!(
                "Page size must be between 1 and {}",
                constants::MAX_PAGE_SIZE
            )));
        }

        Ok(())
    }
}

/// Full endpoint override, then backend root + `/api`, then the settings
/// file, then the compiled default.
pub fn resolve_api_endpoint(
    api_endpoint_env: Option<String>,
    backend_base_env: Option<String>,
    configured: Option<&str>,
) -> String {
    let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

    if let Some(endpoint) = non_empty(api_endpoint_env) {
        return endpoint.trim().trim_end_matches('/').to_string();
    }

    if let Some(base) = non_empty(backend_base_env) {
        return format!("{}/api", base.trim().trim_end_matches('/'));
    }

    if let Some(endpoint) = configured.filter(|v| !v.trim().is_empty()) {
        return endpoint.trim().trim_end_matches('/').to_string();
    }

    constants::endpoints::API.to_string()
}
