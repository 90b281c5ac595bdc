use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::nav_service::NavService;
use crate::services::session_store::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub nav: NavService,
    pub sessions: SessionStore,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(nav: NavService, config: AppConfig) -> Self {
        Self {
            nav,
            sessions: SessionStore::new(),
            config: Arc::new(config),
        }
    }
}
