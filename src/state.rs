use std::sync::Arc;

use crate::config::Config;
use crate::services::auth_service::IdentityResolver;
use crate::services::file_service::FileStore;
use crate::services::project_service::AccessChecker;
use crate::ws::broadcast::Broadcaster;
use crate::ws::presence::PresenceRegistry;

/// Everything a request or connection handler needs, created once at startup.
pub struct AppState {
    pub config: Config,
    pub registry: PresenceRegistry,
    pub broadcaster: Broadcaster,
    pub files: FileStore,
    pub identities: Arc<dyn IdentityResolver>,
    pub access: Arc<dyn AccessChecker>,
}

impl AppState {
    pub fn new(
        config: Config,
        files: FileStore,
        identities: Arc<dyn IdentityResolver>,
        access: Arc<dyn AccessChecker>,
    ) -> Self {
        let broadcaster = Broadcaster::new(config.send_timeout());
        Self {
            config,
            registry: PresenceRegistry::new(),
            broadcaster,
            files,
            identities,
            access,
        }
    }
}
