//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parley_core::{FieldIssue, RelayError};
use thiserror::Error;
use tracing::error;

use crate::models::{ErrorResponse, ValidationErrorResponse};

/// Body text for every 500 response.
pub const GENERATION_FAILED: &str = "Failed to generate a response";

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {} issue(s)", .0.len())]
    Validation(Vec<FieldIssue>),

    #[error("Generation failed")]
    Generation,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(issues) => {
                let body = Json(ValidationErrorResponse {
                    error: "validation_error".into(),
                    message: "Invalid request body".into(),
                    issues,
                });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            AppError::Generation => generation_failed(),
            AppError::Internal(detail) => {
                error!(%detail, "internal error");
                generation_failed()
            }
        }
    }
}

fn generation_failed() -> Response {
    let body = Json(ErrorResponse {
        error: GENERATION_FAILED.into(),
    });
    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}

impl From<RelayError> for AppError {
    fn from(e: RelayError) -> Self {
        match e {
            RelayError::Validation(v) => AppError::Validation(v.issues),
            // Already logged by the relay; the caller only learns it failed.
            RelayError::Generation(_) => AppError::Generation,
        }
    }
}
