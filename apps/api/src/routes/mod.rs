pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::matching::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Search API
        .route("/api/v1/jobs/search", post(handlers::handle_search))
        .route("/api/v1/jobs/:id/similar", get(handlers::handle_similar))
        .route("/api/v1/search/stats", get(handlers::handle_stats))
        .with_state(state)
}
