//! Conversation ledger. Maps a conversation id to the provider response id
//! of its most recent successful exchange.
//!
//! The ledger lives for the lifetime of the process. Nothing is evicted: an
//! abandoned conversation simply stops being looked up.

use dashmap::DashMap;

use crate::conversation::{ConversationId, ProviderResponseId};

/// Key-value store behind the relay's conversation continuity.
///
/// Implementations must be safe to share across request tasks. Ordering of
/// concurrent writes to the same key is the caller's concern; the relay
/// serializes exchanges per conversation before reaching the ledger.
pub trait ConversationLedger: Send + Sync {
    /// Latest provider response id for `id`, if any exchange has succeeded.
    fn get(&self, id: &ConversationId) -> Option<ProviderResponseId>;

    /// Record `response_id` as the latest for `id`, replacing any prior value.
    fn set(&self, id: ConversationId, response_id: ProviderResponseId);

    /// Number of conversations recorded.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unbounded in-memory ledger.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    entries: DashMap<ConversationId, ProviderResponseId>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationLedger for InMemoryLedger {
    fn get(&self, id: &ConversationId) -> Option<ProviderResponseId> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    fn set(&self, id: ConversationId, response_id: ProviderResponseId) {
        self.entries.insert(id, response_id);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
