mod config;
mod db;
mod errors;
mod llm_client;
mod matching;
mod models;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, ExplainerMode};
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::matching::embeddings::{EmbeddingProvider, HashEmbedder};
use crate::matching::explainer::{DelegatedExplainer, Explainer, RuleBasedExplainer};
use crate::matching::scoring::ScoringEngine;
use crate::matching::service::SearchService;
use crate::matching::source::PgJobSource;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobMatch API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    let source = Arc::new(PgJobSource::new(db, config.candidate_limit));

    // Load the embedding model once; refuse to start if it is unusable
    let model = HashEmbedder::new(config.embedding_dimension)
        .context("failed to construct embedding model")?;
    let embeddings = Arc::new(
        EmbeddingProvider::load(Arc::new(model), config.embedding_cache_capacity)
            .context("failed to load embedding model")?,
    );

    let explainer = build_explainer(&config)?;
    info!("Explainer strategy: {}", explainer.strategy());

    let search = SearchService::new(
        ScoringEngine::new(Arc::clone(&embeddings)),
        source,
        explainer,
    );

    // Build app state
    let state = AppState {
        search: Arc::new(search),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    release_after(served, &embeddings)?;

    Ok(())
}

/// Picks the explanation strategy. `llm` without an API key degrades to the
/// rule-based explainer.
fn build_explainer(config: &Config) -> Result<Arc<dyn Explainer>> {
    match (config.explainer, &config.anthropic_api_key) {
        (ExplainerMode::Llm, Some(api_key)) => {
            let llm = LlmClient::new(api_key.clone()).context("failed to build LLM client")?;
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Ok(Arc::new(DelegatedExplainer::new(
                Arc::new(llm),
                Duration::from_millis(config.explain_timeout_ms),
            )))
        }
        (ExplainerMode::Llm, None) => {
            warn!("EXPLAINER=llm but ANTHROPIC_API_KEY is not set; using rule-based explanations");
            Ok(Arc::new(RuleBasedExplainer))
        }
        (ExplainerMode::Rule, _) => Ok(Arc::new(RuleBasedExplainer)),
    }
}

/// Tears down the embedding model, then hands back the server's exit result.
fn release_after<T>(
    served: std::io::Result<T>,
    embeddings: &EmbeddingProvider,
) -> std::io::Result<T> {
    embeddings.shutdown();
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
