//! # parley_core
//!
//! Core relay logic for Parley.
//!
//! A chat exchange flows through [`relay::MessageRelay`]: the raw request is
//! checked by [`validation::validate`], the previous provider response id is
//! looked up in a [`ledger::ConversationLedger`], the prompt is sent to a
//! [`provider::GenerationProvider`], and on success the ledger is advanced.

pub mod conversation;
pub mod ledger;
pub mod provider;
pub mod relay;
pub mod validation;

pub use conversation::{ConversationId, ProviderResponseId};
pub use relay::{ChatReply, GenerationSettings, MessageRelay, RelayError};
pub use validation::{ChatRequest, FieldIssue, RawChatRequest, ValidationError};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
