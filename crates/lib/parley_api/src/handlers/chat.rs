//! Chat relay handler.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use parley_core::{RawChatRequest, ValidationError};
use tracing::debug;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::ChatResponse;

/// `POST /api/v1/chat`: relay one prompt and return the generated text.
///
/// An unparseable body is reported like any other validation failure.
pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<RawChatRequest>, JsonRejection>,
) -> AppResult<Json<ChatResponse>> {
    let Json(raw) = payload.map_err(|rejection| {
        debug!(%rejection, "unreadable chat body");
        AppError::Validation(ValidationError::invalid_body(rejection.body_text()).issues)
    })?;

    let reply = state.relay.relay(&raw).await?;

    Ok(Json(ChatResponse {
        message: reply.message,
    }))
}
