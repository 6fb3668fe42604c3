use super::token_store::{TokenKind, TokenStore};
use crate::error::Result;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Access/refresh pair issued by login, OTP verification and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Session {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Shared handle to the persisted session.
///
/// Clones point at the same store. Writes are not coordinated between
/// callers: the last pair stored wins.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn TokenStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(TokenKind::AccessToken)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(TokenKind::RefreshToken)
    }

    pub fn snapshot(&self) -> Session {
        Session {
            access_token: self.access_token(),
            refresh_token: self.refresh_token(),
        }
    }

    /// Stores both tokens. If the second write fails the session is cleared,
    /// so a new access token never sits next to a stale refresh token.
    pub fn store_tokens(&self, tokens: &TokenPair) -> Result<()> {
        self.store
            .write(TokenKind::AccessToken, &tokens.access_token)?;
        if let Err(e) = self
            .store
            .write(TokenKind::RefreshToken, &tokens.refresh_token)
        {
            error!("Failed to store refresh token, clearing session: {e}");
            if let Err(clear_err) = self.store.clear() {
                error!("Failed to clear session: {clear_err}");
            }
            return Err(e);
        }
        info!("Session tokens updated");
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.store.clear()?;
        info!("Session cleared");
        Ok(())
    }

    fn read(&self, kind: TokenKind) -> Option<String> {
        match self.store.read(kind) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                error!("Failed to read {}: {e}", kind.key());
                None
            }
        }
    }
}
