//! Application state shared across handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::ServerConfig;
use crate::restart::RestartHandle;
use crate::service::NoteService;

/// Application state shared across all handlers.
///
/// This is cloneable and can be extracted in handlers using `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Note use-cases over the configured backend.
    service: NoteService,
    /// Sender for restart requests.
    restart: RestartHandle,
    /// Server configuration.
    config: Arc<ServerConfig>,
    /// When this process started serving.
    booted: DateTime<Utc>,
}

impl AppState {
    /// Create new application state.
    pub fn new(service: NoteService, restart: RestartHandle, config: ServerConfig) -> Self {
        Self {
            service,
            restart,
            config: Arc::new(config),
            booted: Utc::now(),
        }
    }

    pub fn service(&self) -> &NoteService {
        &self.service
    }

    pub fn restart(&self) -> &RestartHandle {
        &self.restart
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn booted(&self) -> DateTime<Utc> {
        self.booted
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("engine", &self.service.engine())
            .field("booted", &self.booted)
            .finish_non_exhaustive()
    }
}
