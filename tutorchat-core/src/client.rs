//! Process-wide composition root.

use std::sync::Arc;

use crate::api::ApiClient;
use crate::chat::ChatService;
use crate::config::CoreConfig;
use crate::error::CoreError;
use crate::manager::ConnectionManager;
use crate::outbox::Outbox;
use crate::session::Credentials;
use crate::store::Store;

/// One fully wired client.
///
/// Build exactly one per process and inject the pieces into whatever layer
/// renders them; nothing in this crate is reachable through globals.
pub struct TutorChat {
    config: CoreConfig,
    session: Arc<dyn Credentials>,
    pub store: Arc<Store>,
    pub outbox: Arc<Outbox>,
    pub manager: Arc<ConnectionManager>,
    pub chat: Arc<ChatService<ApiClient>>,
}

impl TutorChat {
    pub fn new(config: CoreConfig, session: Arc<dyn Credentials>) -> Result<Self, CoreError> {
        let store = Arc::new(match &config.db_path {
            Some(path) => Store::open(path)?,
            None => Store::open_memory()?,
        });
        let outbox = Arc::new(Outbox::new(store.clone(), config.outbound_retry_limit));
        let manager = Arc::new(ConnectionManager::new(
            store.clone(),
            outbox.clone(),
            session.clone(),
            config.reconnect(),
        ));
        let api = ApiClient::new(&config, session.clone())?;
        let chat = Arc::new(ChatService::new(api, store.clone(), session.clone()));
        Ok(Self { config, session, store, outbox, manager, chat })
    }

    /// Open the push connection for the signed-in user. The endpoint is the
    /// configured base plus the user id.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let user_id = self.session.user_id().ok_or(CoreError::NotSignedIn)?;
        let endpoint = format!("{}{user_id}", self.config.ws_base_url);
        self.manager.start(endpoint).await;
        Ok(())
    }

    pub async fn shutdown(&self) {
        self.manager.stop().await;
    }
}
