//! Wire models for the HTTP API.

use parley_core::FieldIssue;
use serde::{Deserialize, Serialize};

/// `GET /api/v1/health` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// `POST /api/v1/chat` success body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
}

/// 400 body: every issue found in the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorResponse {
    pub error: String,
    pub message: String,
    pub issues: Vec<FieldIssue>,
}

/// 500 body. Carries no provider detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
