//! Axum route handlers for the Search API.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::matching::filters::SearchFilters;
use crate::matching::scoring::MatchResult;
use crate::matching::service::SearchStats;
use crate::models::UserProfile;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub profile: Option<UserProfile>,
    #[serde(default)]
    pub filters: Option<SearchFilters>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<MatchResult>,
    pub total: usize,
}

impl From<Vec<MatchResult>> for SearchResponse {
    fn from(results: Vec<MatchResult>) -> Self {
        Self {
            total: results.len(),
            results,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/jobs/search
///
/// Ranks jobs for a free-text query, optionally personalised by a profile and
/// narrowed by filters. A missing limit uses the configured default; larger
/// limits are capped.
pub async fn handle_search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let limit = effective_limit(&state, request.limit);

    let results = state
        .search
        .search(
            &request.query,
            request.profile.as_ref(),
            request.filters.as_ref(),
            limit,
        )
        .await?;

    Ok(Json(results.into()))
}

/// GET /api/v1/jobs/:id/similar
pub async fn handle_similar(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let limit = effective_limit(&state, params.limit);
    let results = state.search.find_similar(&job_id, limit).await?;
    Ok(Json(results.into()))
}

/// GET /api/v1/search/stats
pub async fn handle_stats(State(state): State<AppState>) -> Result<Json<SearchStats>, AppError> {
    Ok(Json(state.search.stats().await?))
}

/// Non-positive values pass through so the service rejects them.
fn effective_limit(state: &AppState, requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(state.config.default_search_limit)
        .min(state.config.max_search_limit)
}
