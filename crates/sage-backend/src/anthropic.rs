//! Anthropic Claude API client with SSE streaming support.

use std::time::Duration;

use async_stream::stream;
use futures::Stream;
use reqwest::Client;
use sage_protocol::{ChatRequest, Role, StreamEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::sse::{sse_events, SseEvent};
use crate::BackendError;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const BETA_HEADER: &str = "prompt-caching-2024-07-31";

/// Anthropic API client.
pub struct AnthropicClient {
    api_key: String,
    model: String,
    http: Client,
}

/// Build an HTTP client with appropriate timeouts and connection limits.
pub(crate) fn build_http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(2)
        .build()
        .expect("failed to build HTTP client")
}

impl AnthropicClient {
    /// Create a new client with the given API key and the provider default model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_model(
            api_key,
            crate::providers::default_model(crate::Provider::Anthropic),
        )
    }

    /// Create a new client with a custom model.
    pub fn with_model(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            http: build_http_client(),
        }
    }

    /// Send a request and return a stream of events.
    ///
    /// Request validation failures and HTTP errors surface as
    /// [`StreamEvent::Error`] so callers consume a single event stream.
    pub fn send(&self, request: &ChatRequest) -> impl Stream<Item = StreamEvent> + Send + 'static {
        let api_key = self.api_key.clone();
        let model = self.model.clone();
        let http = self.http.clone();
        let request = request.clone();

        stream! {
            if let Err(e) = request.validate() {
                yield StreamEvent::Error(e.to_string());
                return;
            }

            match send_streaming(&http, &api_key, &model, &request).await {
                Ok(response) => {
                    let mut events = std::pin::pin!(sse_events(response.bytes_stream()));
                    let mut processor = SseProcessor::new();

                    use futures::StreamExt;

                    while let Some(result) = events.next().await {
                        match result {
                            Ok(sse_event) => {
                                for stream_event in processor.process(&sse_event) {
                                    yield stream_event;
                                }
                            }
                            Err(e) => {
                                yield StreamEvent::Error(format!("Stream error: {e}"));
                                return;
                            }
                        }
                    }

                    yield StreamEvent::Done;
                }
                Err(e) => {
                    yield StreamEvent::Error(e.to_string());
                }
            }
        }
    }

    /// Send a non-streaming request and return the first text block.
    pub async fn complete(&self, request: &ChatRequest) -> Result<String, BackendError> {
        request.validate()?;

        let body = ApiRequest::from_chat(&self.model, request, false);
        let response = self
            .http
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("anthropic-beta", BETA_HEADER)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Api { status, message });
        }

        let resp: NonStreamingResponse = response.json().await?;
        resp.content
            .into_iter()
            .find_map(|block| match block {
                ResponseContentBlock::Text { text } => Some(text),
            })
            .ok_or_else(|| BackendError::Api {
                status: 200,
                message: "no text content in response".to_string(),
            })
    }
}

async fn send_streaming(
    http: &Client,
    api_key: &str,
    model: &str,
    request: &ChatRequest,
) -> Result<reqwest::Response, BackendError> {
    let body = ApiRequest::from_chat(model, request, true);

    let response = http
        .post(API_URL)
        .header("x-api-key", api_key)
        .header("anthropic-version", API_VERSION)
        .header("anthropic-beta", BETA_HEADER)
        .header("content-type", "application/json")
        .json(&body)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        return Err(BackendError::Api { status, message });
    }

    Ok(response)
}

/// Maps Anthropic SSE events to protocol stream events.
///
/// Relevant events: `message_start` (initial usage), `content_block_delta`
/// with `text_delta` chunks, `message_delta` (final output token count),
/// and `error`. Everything else (ping, content_block_start/stop) is noise.
struct SseProcessor;

impl SseProcessor {
    fn new() -> Self {
        Self
    }

    fn process(&mut self, event: &SseEvent) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        let data: Value = match serde_json::from_str(&event.data) {
            Ok(v) => v,
            Err(_) => return events,
        };

        match event.event_type.as_deref().unwrap_or("") {
            "message_start" => {
                if let Some(usage) = data.get("message").and_then(|m| m.get("usage")) {
                    if let (Some(input), Some(output)) = (
                        usage.get("input_tokens").and_then(|v| v.as_u64()),
                        usage.get("output_tokens").and_then(|v| v.as_u64()),
                    ) {
                        events.push(StreamEvent::Usage {
                            input_tokens: input as u32,
                            output_tokens: output as u32,
                        });
                    }
                }
            }
            "content_block_delta" => {
                if let Some(delta) = data.get("delta") {
                    if delta.get("type").and_then(|t| t.as_str()) == Some("text_delta") {
                        if let Some(text) = delta.get("text").and_then(|t| t.as_str()) {
                            events.push(StreamEvent::TextDelta(text.to_string()));
                        }
                    }
                }
            }
            "message_delta" => {
                if let Some(usage) = data.get("usage") {
                    if let Some(output) = usage.get("output_tokens").and_then(|v| v.as_u64()) {
                        events.push(StreamEvent::Usage {
                            input_tokens: 0,
                            output_tokens: output as u32,
                        });
                    }
                }
            }
            "error" => {
                let message = data
                    .get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(|m| m.as_str())
                    .unwrap_or("Unknown error")
                    .to_string();
                events.push(StreamEvent::Error(message));
            }
            _ => {}
        }

        events
    }
}

// API request/response types

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "String::is_empty")]
    system: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    messages: Vec<ApiMessage>,
}

impl ApiRequest {
    fn from_chat(model: &str, request: &ChatRequest, stream: bool) -> Self {
        Self {
            model: model.to_string(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system.clone(),
            stream,
            messages: request
                .messages
                .iter()
                .map(|m| ApiMessage {
                    role: match m.role {
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    },
                    content: m.content.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct NonStreamingResponse {
    content: Vec<ResponseContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
}
