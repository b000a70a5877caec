//! Chat request validation.
//!
//! [`validate`] is pure: it turns a loosely-typed [`RawChatRequest`] into a
//! [`ChatRequest`] or reports every problem it found as a [`FieldIssue`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::conversation::ConversationId;

/// Maximum prompt length in characters, measured after trimming.
pub const MAX_PROMPT_CHARS: usize = 1000;

/// Request body as received; fields stay untyped until validated.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawChatRequest {
    #[serde(default)]
    pub prompt: Option<Value>,
    #[serde(default, rename = "conversationId")]
    pub conversation_id: Option<Value>,
}

impl RawChatRequest {
    /// Convenience constructor for well-formed string fields.
    pub fn new(prompt: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            prompt: Some(Value::String(prompt.into())),
            conversation_id: Some(Value::String(conversation_id.into())),
        }
    }
}

/// A validated chat request. `prompt` is trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub prompt: String,
    pub conversation_id: ConversationId,
}

/// Machine-readable reason for a [`FieldIssue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    Required,
    InvalidType,
    TooSmall,
    TooBig,
    InvalidUuid,
    InvalidJson,
}

/// One problem with one request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: String,
    pub code: IssueCode,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: &str, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// The request was rejected before any side effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid chat request ({} issue(s))", .issues.len())]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    /// The body could not be parsed as a JSON object at all.
    pub fn invalid_body(detail: impl Into<String>) -> Self {
        Self {
            issues: vec![FieldIssue::new("body", IssueCode::InvalidJson, detail)],
        }
    }
}

/// Validate a raw chat request. All issues are collected, not just the first.
pub fn validate(raw: &RawChatRequest) -> Result<ChatRequest, ValidationError> {
    let mut issues = Vec::new();

    let prompt = match raw.prompt.as_ref() {
        None | Some(Value::Null) => {
            issues.push(FieldIssue::new("prompt", IssueCode::Required, "Prompt is required"));
            None
        }
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            let len = trimmed.chars().count();
            if len == 0 {
                issues.push(FieldIssue::new(
                    "prompt",
                    IssueCode::TooSmall,
                    "Prompt cannot be empty",
                ));
                None
            } else if len > MAX_PROMPT_CHARS {
                issues.push(FieldIssue::new(
                    "prompt",
                    IssueCode::TooBig,
                    format!("Prompt must be at most {MAX_PROMPT_CHARS} characters"),
                ));
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Some(_) => {
            issues.push(FieldIssue::new(
                "prompt",
                IssueCode::InvalidType,
                "Prompt must be a string",
            ));
            None
        }
    };

    let conversation_id = match raw.conversation_id.as_ref() {
        None | Some(Value::Null) => {
            issues.push(FieldIssue::new(
                "conversationId",
                IssueCode::Required,
                "Conversation ID is required",
            ));
            None
        }
        Some(Value::String(s)) => match s.parse::<ConversationId>() {
            Ok(id) => Some(id),
            Err(_) => {
                issues.push(FieldIssue::new(
                    "conversationId",
                    IssueCode::InvalidUuid,
                    "Conversation ID must be a valid UUID",
                ));
                None
            }
        },
        Some(_) => {
            issues.push(FieldIssue::new(
                "conversationId",
                IssueCode::InvalidType,
                "Conversation ID must be a string",
            ));
            None
        }
    };

    match (prompt, conversation_id) {
        (Some(prompt), Some(conversation_id)) if issues.is_empty() => Ok(ChatRequest {
            prompt,
            conversation_id,
        }),
        _ => Err(ValidationError { issues }),
    }
}
