use crate::api::transport::{HttpTransport, Transport};
use crate::api::ReferralApi;
use crate::auth::session::SessionStore;
use crate::auth::token_store::{FileTokenStore, KeyringTokenStore, TokenStore};
use crate::auth::{AuthManager, ClearSessionOnExpiry};
use crate::config::{Config, Settings, TokenStorage};
use crate::error::Result;
use log::info;
use std::sync::Arc;

/// Everything a command needs, built once per process.
pub struct App {
    config: Arc<Config>,
    api: Arc<ReferralApi>,
    auth_manager: Arc<AuthManager>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let settings = config.settings();
        settings.validate()?;

        let store = token_store(&config, &settings);
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(settings.request_timeout())?);

        Ok(Self::with_parts(config, transport, store))
    }

    /// Wires the client around an explicit transport and token store.
    pub fn with_parts(
        config: Config,
        transport: Arc<dyn Transport>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        let api_endpoint = config.settings().api_endpoint();
        info!("Using API endpoint: {api_endpoint}");

        let session = SessionStore::new(store);
        let expiry = Arc::new(ClearSessionOnExpiry::new(session.clone()));
        let api = Arc::new(ReferralApi::new(transport, api_endpoint, session, expiry));
        let auth_manager = Arc::new(AuthManager::new(Arc::clone(&api)));

        App {
            config: Arc::new(config),
            api,
            auth_manager,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn api(&self) -> &ReferralApi {
        &self.api
    }

    pub fn auth(&self) -> &AuthManager {
        &self.auth_manager
    }

    /// Page size from settings, for list commands.
    pub fn page_size(&self) -> u32 {
        self.config.settings().page_size
    }
}

fn token_store(config: &Config, settings: &Settings) -> Arc<dyn TokenStore> {
    match settings.token_storage {
        TokenStorage::Keyring => Arc::new(KeyringTokenStore::new()),
        TokenStorage::File => Arc::new(FileTokenStore::new(config.paths().session_file.clone())),
    }
}
