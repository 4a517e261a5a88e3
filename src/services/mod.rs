//! Business logic services

pub mod redis;
pub mod sessions;
pub mod users;

use std::sync::Arc;

use crate::{config::SessionConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub sessions: sessions::SessionService,
}

impl Services {
    /// Create all services with the given repository and session store
    pub fn new(
        repository: Repository,
        session_store: Arc<dyn sessions::SessionStore>,
        session_config: &SessionConfig,
    ) -> Self {
        Self {
            users: users::UsersService::new(repository),
            sessions: sessions::SessionService::new(session_store, session_config.ttl_seconds),
        }
    }

    /// Services backed entirely by process memory
    pub fn in_memory(session_config: &SessionConfig) -> Self {
        Self::new(
            Repository::in_memory(),
            Arc::new(sessions::MemorySessionStore::new()),
            session_config,
        )
    }
}
