//! API server configuration.

use parley_core::GenerationSettings;

/// Configuration for the API server, assembled from CLI flags and env.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3001").
    pub bind_addr: String,
    /// Provider API key. Required to build the production relay.
    pub openai_api_key: Option<String>,
    /// Base URL of the Responses API.
    pub openai_base_url: String,
    /// Model, sampling and deadline settings for each provider call.
    pub generation: GenerationSettings,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<redacted>"))
            .field("openai_base_url", &self.openai_base_url)
            .field("generation", &self.generation)
            .finish()
    }
}
