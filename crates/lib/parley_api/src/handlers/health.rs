//! Liveness endpoint.

use axum::Json;

use crate::models::HealthResponse;

/// `GET /api/v1/health`: always `{"status":"ok"}`; touches no state.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
    })
}
