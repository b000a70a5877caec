//! # parley_api
//!
//! HTTP API library for Parley.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;

use std::any::Any;
use std::sync::Arc;

use axum::Router;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use parley_core::MessageRelay;
use parley_core::ledger::{ConversationLedger, InMemoryLedger};
use parley_core::provider::GenerationError;
use parley_core::provider::openai::OpenAiResponsesProvider;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::error::AppError;
use crate::handlers::{chat, health};

/// Route paths.
pub mod routes {
    pub const GET_API_V1_HEALTH: &str = "/api/v1/health";
    pub const POST_API_V1_CHAT: &str = "/api/v1/chat";
}

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Relay shared by all requests; owns the conversation ledger.
    pub relay: Arc<MessageRelay>,
}

impl AppState {
    /// Build the production state: in-memory ledger + OpenAI Responses provider.
    pub fn from_config(config: ApiConfig) -> Result<Self, GenerationError> {
        let api_key = config.openai_api_key.clone().ok_or_else(|| {
            GenerationError::Config("OPENAI_API_KEY is required".to_string())
        })?;
        let provider = OpenAiResponsesProvider::new(
            api_key,
            &config.openai_base_url,
            config.generation.timeout,
        )?;
        let ledger: Arc<dyn ConversationLedger> = Arc::new(InMemoryLedger::new());
        let relay = MessageRelay::new(ledger, Arc::new(provider), config.generation.clone());

        Ok(Self {
            relay: Arc::new(relay),
        })
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    Router::new()
        .route(routes::GET_API_V1_HEALTH, get(health::health_handler))
        .route(routes::POST_API_V1_CHAT, post(chat::chat_handler))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Turn a handler panic into a 500 so the server keeps running.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    AppError::Internal(format!("handler panicked: {detail}")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use parley_core::GenerationSettings;

    fn config(key: Option<&str>) -> ApiConfig {
        ApiConfig {
            bind_addr: "127.0.0.1:0".into(),
            openai_api_key: key.map(str::to_string),
            openai_base_url: "https://api.openai.com/v1".into(),
            generation: GenerationSettings::default(),
        }
    }

    #[test]
    fn from_config_requires_api_key() {
        assert!(matches!(
            AppState::from_config(config(None)),
            Err(GenerationError::Config(_))
        ));
    }

    #[test]
    fn from_config_starts_with_empty_ledger() {
        let state = AppState::from_config(config(Some("sk-test"))).unwrap();
        assert!(state.relay.ledger().is_empty());
    }

    #[test]
    fn from_config_hands_generation_settings_to_relay() {
        let mut config = config(Some("sk-test"));
        config.generation.model = "gpt-test".into();
        config.generation.max_output_tokens = 64;

        let state = AppState::from_config(config).unwrap();
        assert_eq!(state.relay.settings().model, "gpt-test");
        assert_eq!(state.relay.settings().max_output_tokens, 64);
    }

    #[test]
    fn panic_payload_becomes_server_error() {
        let resp = handle_panic(Box::new("boom"));
        assert_eq!(resp.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
