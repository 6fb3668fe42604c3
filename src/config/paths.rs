use super::constants::APP_NAME;
use crate::error::{ClientError, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub settings_file: PathBuf,
    pub session_file: PathBuf,
    pub log_file: PathBuf,
}

impl AppPaths {
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| {
                ClientError::InvalidConfiguration(
                    "Could not determine config directory".to_string(),
                )
            })?
            .join(APP_NAME);

        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| {
                ClientError::InvalidConfiguration(
                    "Could not determine cache directory".to_string(),
                )
            })?
            .join(APP_NAME);

        Self::from_dirs(config_dir, &cache_dir)
    }

    /// Lays everything out under one directory; used by tests and `--home`.
    pub fn in_dir(root: &Path) -> Result<Self> {
        Self::from_dirs(root.join("config"), &root.join("cache"))
    }

    fn from_dirs(config_dir: PathBuf, cache_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(&config_dir)?;
        std::fs::create_dir_all(cache_dir)?;

        Ok(AppPaths {
            settings_file: config_dir.join("settings.json"),
            session_file: config_dir.join("session.json"),
            log_file: cache_dir.join("referral-cli.log"),
            config_dir,
        })
    }
}
