use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::matching::error::SearchError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(anyhow::Error),

    #[error("Embedding error: {0}")]
    Embedding(String),
}

impl From<SearchError> for AppError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::InvalidQuery | SearchError::InvalidLimit(_) => {
                AppError::Validation(e.to_string())
            }
            SearchError::JobNotFound(_) => AppError::NotFound(e.to_string()),
            SearchError::Storage(inner) => AppError::Database(inner),
            SearchError::Embedding(_) | SearchError::DimensionMismatch { .. } => {
                AppError::Embedding(e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Embedding(msg) => {
                tracing::error!("Embedding error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EMBEDDING_ERROR",
                    "The embedding model failed".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_errors_map_to_status_codes() {
        let cases = [
            (SearchError::InvalidQuery, StatusCode::BAD_REQUEST),
            (SearchError::InvalidLimit(0), StatusCode::BAD_REQUEST),
            (
                SearchError::JobNotFound("x".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                SearchError::Storage(anyhow::anyhow!("connection refused")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                SearchError::DimensionMismatch { left: 3, right: 4 },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(AppError::from(error).into_response().status(), status);
        }
    }
}
