use thiserror::Error;

/// Failures of the embedding backend. `ModelUnavailable` is only raised while
/// loading the provider at startup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmbeddingError {
    #[error("cannot embed empty text")]
    EmptyInput,

    #[error("embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

/// Errors surfaced by the search API.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query must not be empty")]
    InvalidQuery,

    #[error("limit must be positive, got {0}")]
    InvalidLimit(i64),

    #[error("vector dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("embedding failed: {0}")]
    Embedding(EmbeddingError),

    #[error("job {0} not found")]
    JobNotFound(String),

    #[error("candidate fetch failed: {0}")]
    Storage(#[from] anyhow::Error),
}

impl From<EmbeddingError> for SearchError {
    fn from(e: EmbeddingError) -> Self {
        match e {
            EmbeddingError::DimensionMismatch { left, right } => {
                SearchError::DimensionMismatch { left, right }
            }
            other => SearchError::Embedding(other),
        }
    }
}

/// Raised by a delegated explainer; always recovered by the rule-based path.
#[derive(Debug, Error)]
#[error("explanation unavailable: {0}")]
pub struct ExplanationUnavailable(pub String);

pub type Result<T> = std::result::Result<T, SearchError>;
