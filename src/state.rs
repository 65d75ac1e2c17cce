use axum::extract::FromRef;

use crate::{config::Config, repository::DynRepository, services::sessions::SessionStore};

#[derive(Clone)]
pub struct AppState {
    pub repo: DynRepository,
    pub sessions: SessionStore,
    pub config: Config,
}

impl AppState {
    pub fn new(repo: DynRepository, config: Config) -> Self {
        Self {
            repo,
            sessions: SessionStore::new(),
            config,
        }
    }
}

impl FromRef<AppState> for DynRepository {
    fn from_ref(state: &AppState) -> Self {
        state.repo.clone()
    }
}

impl FromRef<AppState> for SessionStore {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
