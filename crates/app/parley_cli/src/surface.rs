//! Chat surface: the client side of one chat session.
//!
//! Each submission walks `Idle → Sending → Settled | Failed → Idle`. The
//! user's turn is appended before the request goes out and is never rolled
//! back. Leaving `Sending` always goes through [`SendingGuard`], so the
//! typing indicator is cleared on success, failure, panic or cancellation.

use log::{debug, warn};
use parley_core::ConversationId;

use crate::client::{ClientError, RelayClient, format_issues};

/// Shown when the relay could not produce a reply.
pub const GENERIC_FAILURE: &str = "Something went wrong, try again later";

/// Shown when the server rejected the request without listing issues.
pub const INVALID_REQUEST: &str = "Invalid request";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Per-submission lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Sending,
    Settled,
    Failed,
}

/// Receives phase changes; the typing indicator is shown while `Sending`.
pub trait SurfaceView: Send {
    fn phase_changed(&mut self, phase: Phase);
}

/// View that renders nothing.
pub struct NullView;

impl SurfaceView for NullView {
    fn phase_changed(&mut self, _phase: Phase) {}
}

/// Result of [`ChatSurface::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Draft was empty or whitespace; nothing was sent.
    Rejected,
    /// Assistant reply appended to the transcript.
    Settled(String),
    /// Request failed; the error banner is set.
    Failed,
}

/// Keys the surface understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub shift: bool,
}

impl KeyInput {
    pub fn plain(key: Key) -> Self {
        Self { key, shift: false }
    }

    pub fn shifted(key: Key) -> Self {
        Self { key, shift: true }
    }
}

/// What the caller should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Edited,
    Submit,
}

/// Moves the surface out of `Sending` when dropped.
///
/// Unless [`SendingGuard::settle`] was called, the exit is recorded as
/// `Failed`.
struct SendingGuard<'a> {
    phase: &'a mut Phase,
    view: &'a mut dyn SurfaceView,
    outcome: Phase,
}

impl<'a> SendingGuard<'a> {
    fn enter(phase: &'a mut Phase, view: &'a mut dyn SurfaceView) -> Self {
        *phase = Phase::Sending;
        view.phase_changed(Phase::Sending);
        Self {
            phase,
            view,
            outcome: Phase::Failed,
        }
    }

    fn settle(&mut self, outcome: Phase) {
        self.outcome = outcome;
    }
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        *self.phase = self.outcome;
        self.view.phase_changed(self.outcome);
        *self.phase = Phase::Idle;
        self.view.phase_changed(Phase::Idle);
    }
}

/// One chat session bound to a fixed conversation id.
///
/// `submit` takes `&mut self`, so a session can have at most one request in
/// flight.
pub struct ChatSurface<C> {
    client: C,
    conversation_id: ConversationId,
    transcript: Vec<ChatMessage>,
    draft: String,
    phase: Phase,
    error: Option<String>,
    view: Box<dyn SurfaceView>,
}

impl<C: RelayClient> ChatSurface<C> {
    /// Start a session with a freshly generated conversation id.
    pub fn new(client: C) -> Self {
        Self::with_conversation(client, ConversationId::new_v4())
    }

    pub fn with_conversation(client: C, conversation_id: ConversationId) -> Self {
        Self {
            client,
            conversation_id,
            transcript: Vec::new(),
            draft: String::new(),
            phase: Phase::Idle,
            error: None,
            view: Box::new(NullView),
        }
    }

    pub fn with_view(mut self, view: Box<dyn SurfaceView>) -> Self {
        self.view = view;
        self
    }

    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn clear_draft(&mut self) {
        self.draft.clear();
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_typing(&self) -> bool {
        self.phase == Phase::Sending
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Apply one key press to the draft.
    ///
    /// Enter submits; Shift+Enter inserts a newline instead.
    pub fn on_key(&mut self, input: KeyInput) -> KeyAction {
        match input.key {
            Key::Enter if input.shift => {
                self.draft.push('\n');
                KeyAction::Edited
            }
            Key::Enter => KeyAction::Submit,
            Key::Backspace => {
                self.draft.pop();
                KeyAction::Edited
            }
            Key::Char(c) => {
                self.draft.push(c);
                KeyAction::Edited
            }
        }
    }

    /// Send the current draft.
    pub async fn submit(&mut self) -> SubmitOutcome {
        let prompt = self.draft.trim().to_string();
        if prompt.is_empty() {
            debug!("ignoring empty submission");
            return SubmitOutcome::Rejected;
        }

        self.transcript.push(ChatMessage::user(prompt.clone()));
        self.draft.clear();
        self.error = None;

        let mut guard = SendingGuard::enter(&mut self.phase, self.view.as_mut());
        match self.client.send(&prompt, self.conversation_id).await {
            Ok(reply) => {
                self.transcript.push(ChatMessage::assistant(reply.clone()));
                guard.settle(Phase::Settled);
                SubmitOutcome::Settled(reply)
            }
            Err(ClientError::Rejected(issues)) => {
                warn!("chat request rejected: {}", format_issues(&issues));
                self.error = Some(if issues.is_empty() {
                    INVALID_REQUEST.to_string()
                } else {
                    format!("{INVALID_REQUEST}: {}", format_issues(&issues))
                });
                SubmitOutcome::Failed
            }
            Err(e) => {
                warn!("chat request failed: {e}");
                self.error = Some(GENERIC_FAILURE.to_string());
                SubmitOutcome::Failed
            }
        }
    }
}
