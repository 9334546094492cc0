use std::sync::Arc;

use crate::config::Config;
use crate::matching::service::SearchService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Search service. Holds the loaded embedding model, the job source and
    /// the explainer strategy chosen at startup.
    pub search: Arc<SearchService>,
    pub config: Config,
}
