use crate::generation::TextGenerator;
use crate::observability::AppMetrics;
use crate::services::medical_phrasing::{PhrasingService, create_phrasing_service};
use crate::services::session::SessionRegistry;
use std::sync::Arc;

/// Application state containing all shared services
#[derive(Clone)]
pub struct AppState {
    /// Live recognition sessions
    pub sessions: Arc<SessionRegistry>,
    /// Word-list phrasing for the grammar endpoints
    pub phrasing: Arc<dyn PhrasingService>,
    /// Request and pipeline counters
    pub metrics: Arc<AppMetrics>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("sessions", &self.sessions.len())
            .field("phrasing", &"Arc<dyn PhrasingService>")
            .field("generator_ready", &self.sessions.has_generator())
            .finish()
    }
}

impl AppState {
    /// Create new application state
    pub fn new(
        sessions: SessionRegistry,
        generator: Option<Arc<dyn TextGenerator>>,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            sessions: Arc::new(sessions),
            phrasing: Arc::from(create_phrasing_service(generator)),
            metrics,
        }
    }
}
