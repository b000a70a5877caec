//! Message relay. Validates a chat request, forwards it to the provider with
//! the conversation's continuation token, and advances the ledger.
//!
//! The ledger is written only after the provider call has fully succeeded.
//! A failed or timed-out call leaves the previous entry in place.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::conversation::ConversationId;
use crate::ledger::ConversationLedger;
use crate::provider::{GenerationError, GenerationProvider, GenerationRequest};
use crate::validation::{ChatRequest, RawChatRequest, ValidationError, validate};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 500;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors returned by [`MessageRelay::relay`].
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),
}

/// Sampling and deadline settings applied to every provider call.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Upper bound on a single provider call.
    pub timeout: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Successful relay result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
}

/// Relays chat prompts to a [`GenerationProvider`] and keeps per-conversation
/// continuity in a [`ConversationLedger`].
pub struct MessageRelay {
    ledger: Arc<dyn ConversationLedger>,
    provider: Arc<dyn GenerationProvider>,
    settings: GenerationSettings,
    /// One lock per conversation, held from ledger read to ledger write.
    turns: DashMap<ConversationId, Arc<Mutex<()>>>,
}

impl MessageRelay {
    pub fn new(
        ledger: Arc<dyn ConversationLedger>,
        provider: Arc<dyn GenerationProvider>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            ledger,
            provider,
            settings,
            turns: DashMap::new(),
        }
    }

    pub fn ledger(&self) -> &Arc<dyn ConversationLedger> {
        &self.ledger
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Validate `raw` and run one exchange.
    ///
    /// Validation failures return before the provider or ledger is touched.
    pub async fn relay(&self, raw: &RawChatRequest) -> Result<ChatReply, RelayError> {
        let request = validate(raw).inspect_err(|e| {
            debug!(issues = e.issues.len(), "rejected chat request");
        })?;
        self.exchange(request).await
    }

    /// Run one exchange for an already-validated request.
    ///
    /// Exchanges for the same conversation run one at a time, so each turn
    /// continues from the response of the turn before it.
    pub async fn exchange(&self, request: ChatRequest) -> Result<ChatReply, RelayError> {
        let ChatRequest {
            prompt,
            conversation_id,
        } = request;

        let turn = self.turn_lock(conversation_id);
        let _turn = turn.lock().await;

        let previous = self.ledger.get(&conversation_id);
        info!(
            conversation_id = %conversation_id,
            continued = previous.is_some(),
            prompt_chars = prompt.chars().count(),
            "relaying chat prompt"
        );

        let call = self.provider.generate(GenerationRequest {
            model: self.settings.model.clone(),
            input: prompt,
            temperature: self.settings.temperature,
            max_output_tokens: self.settings.max_output_tokens,
            previous_response_id: previous,
        });

        let generation = match tokio::time::timeout(self.settings.timeout, call).await {
            Ok(Ok(generation)) => generation,
            Ok(Err(e)) => {
                warn!(
                    conversation_id = %conversation_id,
                    provider = self.provider.name(),
                    error = %e,
                    "generation failed"
                );
                return Err(e.into());
            }
            Err(_) => {
                let e = GenerationError::Timeout(self.settings.timeout);
                warn!(
                    conversation_id = %conversation_id,
                    provider = self.provider.name(),
                    error = %e,
                    "generation timed out"
                );
                return Err(e.into());
            }
        };

        self.ledger.set(conversation_id, generation.response_id.clone());
        debug!(
            conversation_id = %conversation_id,
            response_id = %generation.response_id,
            "ledger advanced"
        );

        Ok(ChatReply {
            message: generation.output_text,
        })
    }

    fn turn_lock(&self, id: ConversationId) -> Arc<Mutex<()>> {
        Arc::clone(self.turns.entry(id).or_default().value())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;

    use super::*;
    use crate::conversation::ProviderResponseId;
    use crate::ledger::InMemoryLedger;
    use crate::provider::Generation;
    use crate::validation::IssueCode;

    const ID: &str = "123e4567-e89b-12d3-a456-426614174000";

    /// Replays scripted outcomes and records every request it receives.
    #[derive(Default)]
    struct ScriptedProvider {
        outcomes: StdMutex<VecDeque<Result<Generation, GenerationError>>>,
        calls: StdMutex<Vec<GenerationRequest>>,
        delay: Option<Duration>,
    }

    impl ScriptedProvider {
        fn with(outcomes: Vec<Result<Generation, GenerationError>>) -> Self {
            Self {
                outcomes: StdMutex::new(outcomes.into()),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<GenerationRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerationProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(
            &self,
            request: GenerationRequest,
        ) -> Result<Generation, GenerationError> {
            self.calls.lock().unwrap().push(request);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GenerationError::Transport("script exhausted".into())))
        }
    }

    fn ok(id: &str, text: &str) -> Result<Generation, GenerationError> {
        Ok(Generation {
            response_id: ProviderResponseId::new(id),
            output_text: text.to_string(),
        })
    }

    fn relay_with(provider: Arc<ScriptedProvider>) -> (MessageRelay, Arc<InMemoryLedger>) {
        let ledger = Arc::new(InMemoryLedger::new());
        let relay = MessageRelay::new(ledger.clone(), provider, GenerationSettings::default());
        (relay, ledger)
    }

    fn conv(s: &str) -> ConversationId {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn first_turn_has_no_continuation_and_records_response() {
        let provider = Arc::new(ScriptedProvider::with(vec![ok("r1", "Hi there")]));
        let (relay, ledger) = relay_with(provider.clone());

        let reply = relay.relay(&RawChatRequest::new("Hello", ID)).await.unwrap();

        assert_eq!(reply.message, "Hi there");
        assert_eq!(ledger.get(&conv(ID)), Some(ProviderResponseId::new("r1")));
        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].input, "Hello");
        assert_eq!(calls[0].model, DEFAULT_MODEL);
        assert!(calls[0].previous_response_id.is_none());
    }

    #[tokio::test]
    async fn second_turn_continues_from_first_response() {
        let provider = Arc::new(ScriptedProvider::with(vec![
            ok("r1", "Hi there"),
            ok("r2", "Fine, thanks"),
        ]));
        let (relay, ledger) = relay_with(provider.clone());

        relay.relay(&RawChatRequest::new("Hello", ID)).await.unwrap();
        let reply = relay
            .relay(&RawChatRequest::new("How are you", ID))
            .await
            .unwrap();

        assert_eq!(reply.message, "Fine, thanks");
        let calls = provider.calls();
        assert_eq!(
            calls[1].previous_response_id,
            Some(ProviderResponseId::new("r1"))
        );
        assert_eq!(ledger.get(&conv(ID)), Some(ProviderResponseId::new("r2")));
    }

    #[tokio::test]
    async fn other_conversation_starts_fresh() {
        let other = "9b2f2a8e-4c1d-4f7a-8e3b-2d6c5a1f0e9d";
        let provider = Arc::new(ScriptedProvider::with(vec![ok("r1", "a"), ok("r9", "b")]));
        let (relay, _ledger) = relay_with(provider.clone());

        relay.relay(&RawChatRequest::new("Hello", ID)).await.unwrap();
        relay.relay(&RawChatRequest::new("Hello", other)).await.unwrap();

        assert!(provider.calls()[1].previous_response_id.is_none());
    }

    #[tokio::test]
    async fn validation_failure_never_calls_provider() {
        let provider = Arc::new(ScriptedProvider::with(vec![ok("r1", "x")]));
        let (relay, ledger) = relay_with(provider.clone());

        let err = relay
            .relay(&RawChatRequest::new("   ", ID))
            .await
            .unwrap_err();

        match err {
            RelayError::Validation(v) => assert_eq!(v.issues[0].code, IssueCode::TooSmall),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(provider.calls().is_empty());
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn provider_failure_leaves_ledger_untouched() {
        let provider = Arc::new(ScriptedProvider::with(vec![
            ok("r1", "Hi"),
            Err(GenerationError::Status {
                status: 500,
                body: "boom".into(),
            }),
        ]));
        let (relay, ledger) = relay_with(provider.clone());

        relay.relay(&RawChatRequest::new("Hello", ID)).await.unwrap();
        let err = relay
            .relay(&RawChatRequest::new("Again", ID))
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::Generation(_)));
        assert_eq!(ledger.get(&conv(ID)), Some(ProviderResponseId::new("r1")));
    }

    #[tokio::test]
    async fn failure_on_first_turn_creates_no_entry() {
        let provider = Arc::new(ScriptedProvider::with(vec![Err(
            GenerationError::Transport("connection reset".into()),
        )]));
        let (relay, ledger) = relay_with(provider);

        assert!(relay.relay(&RawChatRequest::new("Hello", ID)).await.is_err());
        assert!(ledger.get(&conv(ID)).is_none());
    }

    #[tokio::test]
    async fn slow_provider_times_out_without_ledger_write() {
        let provider = Arc::new(ScriptedProvider {
            outcomes: StdMutex::new(vec![ok("r1", "late")].into()),
            delay: Some(Duration::from_secs(5)),
            ..Default::default()
        });
        let ledger = Arc::new(InMemoryLedger::new());
        let relay = MessageRelay::new(
            ledger.clone(),
            provider,
            GenerationSettings {
                timeout: Duration::from_millis(20),
                ..Default::default()
            },
        );

        let err = relay
            .relay(&RawChatRequest::new("Hello", ID))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RelayError::Generation(GenerationError::Timeout(_))
        ));
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn concurrent_turns_for_one_conversation_are_chained() {
        let provider = Arc::new(ScriptedProvider {
            outcomes: StdMutex::new(vec![ok("r1", "one"), ok("r2", "two")].into()),
            delay: Some(Duration::from_millis(30)),
            ..Default::default()
        });
        let (relay, ledger) = relay_with(provider.clone());
        let relay = Arc::new(relay);

        let a = tokio::spawn({
            let relay = relay.clone();
            async move { relay.relay(&RawChatRequest::new("first", ID)).await }
        });
        let b = tokio::spawn({
            let relay = relay.clone();
            async move { relay.relay(&RawChatRequest::new("second", ID)).await }
        });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].previous_response_id.is_none());
        assert_eq!(
            calls[1].previous_response_id,
            Some(ProviderResponseId::new("r1"))
        );
        assert_eq!(ledger.get(&conv(ID)), Some(ProviderResponseId::new("r2")));
    }
}
