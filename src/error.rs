//! Domain-specific error types for feedback-insights

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Main error type for the feedback-insights service
#[derive(Error, Debug)]
pub enum InsightsError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<rusqlite::Error> for InsightsError {
    fn from(err: rusqlite::Error) -> Self {
        InsightsError::Database {
            message: err.to_string(),
        }
    }
}

impl From<csv::Error> for InsightsError {
    fn from(err: csv::Error) -> Self {
        InsightsError::Validation {
            message: format!("CSV parsing error: {}", err),
        }
    }
}

impl From<tokio::task::JoinError> for InsightsError {
    fn from(err: tokio::task::JoinError) -> Self {
        InsightsError::Internal {
            message: format!("Blocking task failed: {}", err),
        }
    }
}

impl InsightsError {
    /// HTTP status reported for this error
    pub fn status(&self) -> StatusCode {
        match self {
            InsightsError::Database { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InsightsError::Validation { .. } => StatusCode::BAD_REQUEST,
            InsightsError::Config { .. } | InsightsError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Convert InsightsError to a JSON error response
impl IntoResponse for InsightsError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!("{}", self);
        (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            json!({
                "error": {
                    "code": status.as_u16(),
                    "message": self.to_string(),
                }
            })
            .to_string(),
        )
            .into_response()
    }
}

/// Result type alias for feedback-insights operations
pub type Result<T> = std::result::Result<T, InsightsError>;
