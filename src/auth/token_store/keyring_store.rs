use super::{TokenKind, TokenStore};
use crate::error::Result;
use log::{debug, error};

const SERVICE_NAME: &str = "referral-client";

/// Tokens kept in the operating system keyring
pub struct KeyringTokenStore {
    service: String,
}

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, kind: TokenKind) -> Result<keyring::Entry> {
        Ok(keyring::Entry::new(&self.service, kind.key())?)
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeyringTokenStore {
    fn read(&self, kind: TokenKind) -> Result<Option<String>> {
        debug!("Reading {} from keyring", kind.key());
        match self.entry(kind)?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => {
                debug!("No {} in keyring", kind.key());
                Ok(None)
            }
            Err(e) => {
                error!("Error reading {} from keyring: {e}", kind.key());
                Err(e.into())
            }
        }
    }

    fn write(&self, kind: TokenKind, value: &str) -> Result<()> {
        debug!("Writing {} to keyring", kind.key());
        self.entry(kind)?.set_password(value).map_err(|e| {
            error!("Error writing {} to keyring: {e}", kind.key());
            e.into()
        })
    }

    fn clear(&self) -> Result<()> {
        for kind in TokenKind::ALL {
            match self.entry(kind)?.delete_credential() {
                Ok(()) => debug!("Deleted {} from keyring", kind.key()),
                Err(keyring::Error::NoEntry) => debug!("No {} to delete", kind.key()),
                Err(e) => {
                    error!("Error deleting {} from keyring: {e}", kind.key());
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }
}
