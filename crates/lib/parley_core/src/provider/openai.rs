//! OpenAI Responses API provider.
//!
//! Calls `POST {base_url}/responses`. Continuity is delegated to the provider
//! through `previous_response_id`; no history is sent from this side.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::{Generation, GenerationError, GenerationProvider, GenerationRequest};
use crate::conversation::ProviderResponseId;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: &'a str,
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_response_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct ResponsesBody {
    #[serde(default)]
    id: Option<String>,
    /// Convenience aggregate; not every deployment includes it.
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Deserialize)]
struct OutputItem {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Provider backed by an OpenAI-compatible Responses endpoint.
pub struct OpenAiResponsesProvider {
    client: Client,
    endpoint: Url,
    api_key: String,
    request_timeout: Duration,
}

impl OpenAiResponsesProvider {
    /// Build a provider for `base_url` (e.g. `https://api.openai.com/v1`).
    ///
    /// `request_timeout` bounds each HTTP exchange at the client level.
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        request_timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GenerationError::Config("API key is empty".into()));
        }

        let endpoint = format!("{}/responses", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| GenerationError::Config(format!("invalid base URL {base_url}: {e}")))?;

        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| GenerationError::Config(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            request_timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl GenerationProvider for OpenAiResponsesProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<Generation, GenerationError> {
        let body = ResponsesRequest {
            model: &request.model,
            input: &request.input,
            temperature: request.temperature,
            max_output_tokens: request.max_output_tokens,
            previous_response_id: request.previous_response_id.as_ref().map(|r| r.as_str()),
        };

        debug!(
            model = %request.model,
            continued = request.previous_response_id.is_some(),
            "calling responses endpoint"
        );

        let resp = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.map_reqwest_error(e))?;

        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_generation(&text)
    }
}

impl OpenAiResponsesProvider {
    fn map_reqwest_error(&self, e: reqwest::Error) -> GenerationError {
        if e.is_timeout() {
            GenerationError::Timeout(self.request_timeout)
        } else {
            GenerationError::Transport(e.to_string())
        }
    }
}

/// Extract the response id and generated text from a Responses API body.
fn parse_generation(body: &str) -> Result<Generation, GenerationError> {
    let parsed: ResponsesBody = serde_json::from_str(body)
        .map_err(|e| GenerationError::MalformedResponse(format!("invalid JSON: {e}")))?;

    let id = parsed
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| GenerationError::MalformedResponse("missing response id".into()))?;

    let output_text = match parsed.output_text {
        Some(text) => text,
        None => {
            let parts: Vec<String> = parsed
                .output
                .into_iter()
                .filter(|item| item.kind == "message")
                .flat_map(|item| item.content)
                .filter(|part| part.kind == "output_text")
                .filter_map(|part| part.text)
                .collect();
            if parts.is_empty() {
                return Err(GenerationError::MalformedResponse(
                    "response contains no output text".into(),
                ));
            }
            parts.concat()
        }
    };

    Ok(Generation {
        response_id: ProviderResponseId::new(id),
        output_text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn request(previous: Option<&str>) -> GenerationRequest {
        GenerationRequest {
            model: "gpt-4o-mini".into(),
            input: "Hello".into(),
            temperature: 0.7,
            max_output_tokens: 500,
            previous_response_id: previous.map(ProviderResponseId::new),
        }
    }

    #[test]
    fn parse_prefers_output_text_aggregate() {
        let g = parse_generation(r#"{"id":"r1","output_text":"Hi there","output":[]}"#).unwrap();
        assert_eq!(g.response_id.as_str(), "r1");
        assert_eq!(g.output_text, "Hi there");
    }

    #[test]
    fn parse_concatenates_message_parts() {
        let body = json!({
            "id": "resp_1",
            "output": [
                {"type": "reasoning", "content": []},
                {"type": "message", "content": [
                    {"type": "output_text", "text": "Hi "},
                    {"type": "output_text", "text": "there"}
                ]}
            ]
        });
        let g = parse_generation(&body.to_string()).unwrap();
        assert_eq!(g.output_text, "Hi there");
    }

    #[test]
    fn parse_rejects_missing_id() {
        let err = parse_generation(r#"{"output_text":"x"}"#).unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));
    }

    #[test]
    fn parse_rejects_missing_text() {
        let err = parse_generation(r#"{"id":"r1","output":[]}"#).unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));
    }

    #[test]
    fn parse_rejects_non_json() {
        let err = parse_generation("<html>").unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));
    }

    #[test]
    fn new_rejects_empty_key() {
        let err = OpenAiResponsesProvider::new("  ", DEFAULT_BASE_URL, Duration::from_secs(5));
        assert!(matches!(err, Err(GenerationError::Config(_))));
    }

    #[test]
    fn endpoint_joins_base_url() {
        let p = OpenAiResponsesProvider::new("sk", "https://example.test/v1/", Duration::from_secs(5))
            .unwrap();
        assert_eq!(p.endpoint().as_str(), "https://example.test/v1/responses");
    }

    #[tokio::test]
    async fn generate_sends_request_and_parses_reply() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/responses")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4o-mini",
                "input": "Hello",
                "max_output_tokens": 500,
                "previous_response_id": "r0"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"r1","output_text":"Hi there"}"#)
            .create_async()
            .await;

        let provider =
            OpenAiResponsesProvider::new("sk-test", &server.url(), Duration::from_secs(5)).unwrap();
        let g = provider.generate(request(Some("r0"))).await.unwrap();

        assert_eq!(g.response_id, ProviderResponseId::new("r1"));
        assert_eq!(g.output_text, "Hi there");
        mock.assert_async().await;
    }

    #[test]
    fn request_body_omits_previous_response_id_on_first_turn() {
        let body = ResponsesRequest {
            model: "gpt-4o-mini",
            input: "Hello",
            temperature: 0.5,
            max_output_tokens: 500,
            previous_response_id: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("previous_response_id").is_none());
        assert_eq!(value["input"], "Hello");
    }

    #[tokio::test]
    async fn generate_maps_error_status() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/responses")
            .with_status(401)
            .with_body(r#"{"error":{"message":"bad key"}}"#)
            .create_async()
            .await;

        let provider =
            OpenAiResponsesProvider::new("sk-bad", &server.url(), Duration::from_secs(5)).unwrap();
        let err = provider.generate(request(None)).await.unwrap_err();
        match err {
            GenerationError::Status { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("bad key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn generate_maps_connection_failure() {
        // Reserve a port, then release it so the connection is refused.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let base = format!("http://127.0.0.1:{port}");
        let provider = OpenAiResponsesProvider::new("sk", &base, Duration::from_secs(5)).unwrap();
        let err = provider.generate(request(None)).await.unwrap_err();
        assert!(matches!(err, GenerationError::Transport(_)));
    }

    #[tokio::test]
    async fn generate_maps_client_timeout() {
        // Accepts connections but never writes a response.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accept = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let timeout = Duration::from_millis(100);
        let provider =
            OpenAiResponsesProvider::new("sk", &format!("http://{addr}"), timeout).unwrap();
        let err = provider.generate(request(None)).await.unwrap_err();

        match err {
            GenerationError::Timeout(d) => assert_eq!(d, timeout),
            other => panic!("unexpected error: {other:?}"),
        }
        accept.abort();
    }
}
