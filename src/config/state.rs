// Application state module
// Owns everything request handlers share: settings, sheet store, dev-server supervisor

use super::types::Config;
use crate::process::DevServer;
use crate::store::SheetStore;

/// Application state, shared by `Arc` across connections
pub struct AppState {
    pub config: Config,
    pub store: SheetStore,
    pub dev_server: DevServer,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            store: SheetStore::new(),
            dev_server: DevServer::new(config.dev_server.clone()),
        }
    }

    /// Whether per-request access logging is on
    pub const fn access_log(&self) -> bool {
        self.config.logging.access_log
    }
}
