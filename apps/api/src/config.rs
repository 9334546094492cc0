use std::str::FromStr;

use anyhow::{bail, Context, Result};

/// Which explanation strategy the search service uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplainerMode {
    Rule,
    Llm,
}

impl FromStr for ExplainerMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rule" | "rules" | "rule_based" => Ok(ExplainerMode::Rule),
            "llm" | "delegated" => Ok(ExplainerMode::Llm),
            other => bail!("EXPLAINER must be 'rule' or 'llm', got '{other}'"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: Option<String>,
    pub explainer: ExplainerMode,
    pub explain_timeout_ms: u64,
    pub embedding_dimension: usize,
    pub embedding_cache_capacity: u64,
    pub candidate_limit: i64,
    pub default_search_limit: i64,
    pub max_search_limit: i64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            explainer: env_or("EXPLAINER", ExplainerMode::Rule)?,
            explain_timeout_ms: env_or("EXPLAIN_TIMEOUT_MS", 8_000)?,
            embedding_dimension: env_or("EMBEDDING_DIMENSION", 384)?,
            embedding_cache_capacity: env_or("EMBEDDING_CACHE_CAPACITY", 10_000)?,
            candidate_limit: env_or("CANDIDATE_LIMIT", 500)?,
            default_search_limit: env_or("DEFAULT_SEARCH_LIMIT", 20)?,
            max_search_limit: env_or("MAX_SEARCH_LIMIT", 100)?,
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key} is invalid ('{raw}'): {e}")),
        Err(_) => Ok(default),
    }
}
