//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use admit_chat::ResponseComposer;
use admit_core::config::AdmitConfig;

/// Shared application state, cloned into every handler task.
#[derive(Clone)]
pub struct AppState {
    /// The query pipeline.
    pub composer: Arc<ResponseComposer>,
    /// Loaded configuration. Read-only once the server starts.
    pub config: Arc<AdmitConfig>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(composer: Arc<ResponseComposer>, config: AdmitConfig) -> Self {
        Self {
            composer,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }
}
