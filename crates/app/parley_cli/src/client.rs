//! HTTP client for the Parley API.

use async_trait::async_trait;
use log::debug;
use parley_core::{ConversationId, FieldIssue};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Errors surfaced by a [`RelayClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("request rejected: {}", format_issues(.0))]
    Rejected(Vec<FieldIssue>),

    #[error("server responded with status {0}")]
    Server(u16),

    #[error("unexpected response: {0}")]
    Malformed(String),

    #[error("invalid server URL: {0}")]
    InvalidUrl(String),
}

/// Render validation issues as one line, `field: message` joined by `; `.
pub(crate) fn format_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Sends one prompt for one conversation and returns the assistant text.
#[async_trait]
pub trait RelayClient: Send + Sync {
    async fn send(
        &self,
        prompt: &str,
        conversation_id: ConversationId,
    ) -> Result<String, ClientError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatBody<'a> {
    prompt: &'a str,
    conversation_id: ConversationId,
}

#[derive(Deserialize)]
struct ChatReplyBody {
    message: String,
}

#[derive(Deserialize)]
struct ValidationBody {
    #[serde(default)]
    issues: Vec<FieldIssue>,
}

#[derive(Deserialize)]
struct HealthBody {
    status: String,
}

/// [`RelayClient`] over HTTP.
pub struct HttpRelayClient {
    client: Client,
    base: Url,
}

impl HttpRelayClient {
    /// `server` may carry a path prefix (`http://host/parley`); endpoints are
    /// resolved below it.
    pub fn new(server: &str) -> Result<Self, ClientError> {
        let mut base =
            Url::parse(server).map_err(|e| ClientError::InvalidUrl(format!("{server}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(format!("{server}: not a base URL")));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            client: Client::new(),
            base,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))
    }

    /// `GET /api/v1/health`; returns the reported status string.
    pub async fn health(&self) -> Result<String, ClientError> {
        let resp = self
            .client
            .get(self.endpoint("api/v1/health")?)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if resp.status() != StatusCode::OK {
            return Err(ClientError::Server(resp.status().as_u16()));
        }
        let body: HealthBody = resp
            .json()
            .await
            .map_err(|e| ClientError::Malformed(e.to_string()))?;
        Ok(body.status)
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn send(
        &self,
        prompt: &str,
        conversation_id: ConversationId,
    ) -> Result<String, ClientError> {
        debug!("posting chat prompt for conversation {conversation_id}");

        let resp = self
            .client
            .post(self.endpoint("api/v1/chat")?)
            .json(&ChatBody {
                prompt,
                conversation_id,
            })
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        match resp.status() {
            StatusCode::OK => {
                let body: ChatReplyBody = resp
                    .json()
                    .await
                    .map_err(|e| ClientError::Malformed(e.to_string()))?;
                Ok(body.message)
            }
            StatusCode::BAD_REQUEST => {
                let body: ValidationBody = resp
                    .json()
                    .await
                    .map_err(|e| ClientError::Malformed(e.to_string()))?;
                Err(ClientError::Rejected(body.issues))
            }
            other => Err(ClientError::Server(other.as_u16())),
        }
    }
}
