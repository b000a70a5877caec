//! Generation provider: the external language-model service.
//!
//! The relay only talks to the [`GenerationProvider`] trait. The production
//! implementation is [`openai::OpenAiResponsesProvider`]; tests substitute
//! in-process fakes.

pub mod openai;

use async_trait::async_trait;
use thiserror::Error;

use crate::conversation::ProviderResponseId;

/// Errors that can occur while generating a response.
///
/// The relay treats every variant the same way; the distinction only exists
/// for logs.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Provider request failed: {0}")]
    Transport(String),

    #[error("Provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Provider did not answer within {0:?}")]
    Timeout(std::time::Duration),

    #[error("Provider config error: {0}")]
    Config(String),
}

/// One call to the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub input: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Response id of the previous turn, when continuing a conversation.
    pub previous_response_id: Option<ProviderResponseId>,
}

/// Provider output for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub response_id: ProviderResponseId,
    pub output_text: String,
}

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &str;

    async fn generate(&self, request: GenerationRequest) -> Result<Generation, GenerationError>;
}
