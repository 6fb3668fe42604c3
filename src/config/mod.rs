pub mod constants;
pub mod paths;
pub mod settings;

use crate::error::Result;
use std::sync::{Arc, Mutex, MutexGuard};

pub use paths::AppPaths;
pub use settings::{Settings, TokenStorage};

pub struct Config {
    paths: AppPaths,
    settings: Arc<Mutex<Settings>>,
}

impl Config {
    pub fn new() -> Result<Self> {
        Self::with_paths(AppPaths::new()?)
    }

    pub fn with_paths(paths: AppPaths) -> Result<Self> {
        let settings = Settings::load(&paths.settings_file)?;

        Ok(Config {
            paths,
            settings: Arc::new(Mutex::new(settings)),
        })
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    /// Copy of the current settings.
    pub fn settings(&self) -> Settings {
        self.lock().clone()
    }

    pub fn update_settings<F>(&self, updater: F) -> Result<()>
    where
        F: FnOnce(&mut Settings),
    {
        let mut settings = self.lock();
        let mut updated = settings.clone();
        updater(&mut updated);
        updated.validate()?;
        updated.save(&self.paths.settings_file)?;
        *settings = updated;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Settings> {
        self.settings.lock().unwrap_or_else(|e| e.into_inner())
    }
}
