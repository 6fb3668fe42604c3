use crate::error::Result;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

mod keyring_store;
pub use keyring_store::KeyringTokenStore;

#[cfg(test)]
#[path = "token_store_test.rs"]
mod token_store_test;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    AccessToken,
    RefreshToken,
}

impl TokenKind {
    pub const ALL: [TokenKind; 2] = [TokenKind::AccessToken, TokenKind::RefreshToken];

    pub fn key(self) -> &'static str {
        match self {
            TokenKind::AccessToken => "access_token",
            TokenKind::RefreshToken => "refresh_token",
        }
    }
}

/// Persists the two session tokens across process restarts
pub trait TokenStore: Send + Sync {
    fn read(&self, kind: TokenKind) -> Result<Option<String>>;
    fn write(&self, kind: TokenKind, value: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Process-local store; nothing survives a restart
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<TokenKind, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(access_token: &str, refresh_token: &str) -> Self {
        let store = Self::new();
        if let Ok(mut tokens) = store.tokens.lock() {
            tokens.insert(TokenKind::AccessToken, access_token.to_string());
            tokens.insert(TokenKind::RefreshToken, refresh_token.to_string());
        }
        store
    }

    fn tokens(&self) -> std::sync::MutexGuard<'_, HashMap<TokenKind, String>> {
        // a poisoned map still holds plain strings
        self.tokens.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TokenStore for MemoryTokenStore {
    fn read(&self, kind: TokenKind) -> Result<Option<String>> {
        Ok(self.tokens().get(&kind).cloned())
    }

    fn write(&self, kind: TokenKind, value: &str) -> Result<()> {
        self.tokens().insert(kind, value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.tokens().clear();
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionFile {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

impl SessionFile {
    fn slot(&mut self, kind: TokenKind) -> &mut Option<String> {
        match kind {
            TokenKind::AccessToken => &mut self.access_token,
            TokenKind::RefreshToken => &mut self.refresh_token,
        }
    }
}

/// Plain JSON file in the config directory, for hosts without a keyring
pub struct FileTokenStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<SessionFile> {
        if !self.path.exists() {
            return Ok(SessionFile::default());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, session: &SessionFile) -> Result<()> {
        let content = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, content)?;
        restrict_permissions(&self.path)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn read(&self, kind: TokenKind) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut session = self.load()?;
        Ok(session.slot(kind).clone())
    }

    fn write(&self, kind: TokenKind, value: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut session = self.load()?;
        *session.slot(kind) = Some(value.to_string());
        debug!("Writing {} to {}", kind.key(), self.path.display());
        self.save(&session)
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            info!("Removed session file {}", self.path.display());
        }
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &std::path::Path) -> Result<()> {
    Ok(())
}
