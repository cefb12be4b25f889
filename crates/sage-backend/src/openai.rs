//! OpenAI chat completions client with SSE streaming support.
//!
//! Same surface as [`crate::AnthropicClient`]; the differences are the wire
//! format: bearer auth, the system prompt as a leading message, untyped SSE
//! events with a `data: [DONE]` terminator, and usage arriving in a final
//! chunk requested via `stream_options`.

use async_stream::stream;
use futures::Stream;
use reqwest::Client;
use sage_protocol::{ChatRequest, Role, StreamEvent};
use serde::Serialize;
use serde_json::Value;

use crate::anthropic::build_http_client;
use crate::sse::sse_events;
use crate::BackendError;

const API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DONE_MARKER: &str = "[DONE]";

/// OpenAI API client.
pub struct OpenAiClient {
    api_key: String,
    model: String,
    http: Client,
}

impl OpenAiClient {
    /// Create a new client with the given API key and the provider default model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_model(
            api_key,
            crate::providers::default_model(crate::Provider::OpenAi),
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

                    use futures::StreamExt;

                    while let Some(result) = events.next().await {
                        match result {
                            Ok(sse_event) => {
                                if sse_event.data == DONE_MARKER {
                                    break;
                                }
                                for stream_event in process_chunk(&sse_event.data) {
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

    /// Send a non-streaming request and return the message content.
    pub async fn complete(&self, request: &ChatRequest) -> Result<String, BackendError> {
        request.validate()?;

        let body = ApiRequest::from_chat(&self.model, request, false);
        let response = self
            .http
            .post(API_URL)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Api { status, message });
        }

        let resp: Value = response.json().await?;
        resp.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| BackendError::Api {
                status: 200,
                message: "no message content in response".to_string(),
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
        .bearer_auth(api_key)
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

/// Map one streamed chunk (already JSON) to protocol events.
fn process_chunk(data: &str) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    let chunk: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(_) => return events,
    };

    if let Some(message) = chunk
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
    {
        events.push(StreamEvent::Error(message.to_string()));
        return events;
    }

    if let Some(content) = chunk
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(|c| c.as_str())
    {
        if !content.is_empty() {
            events.push(StreamEvent::TextDelta(content.to_string()));
        }
    }

    // The usage chunk (requested via stream_options) has an empty choices array.
    if let Some(usage) = chunk.get("usage").filter(|u| !u.is_null()) {
        if let (Some(input), Some(output)) = (
            usage.get("prompt_tokens").and_then(|v| v.as_u64()),
            usage.get("completion_tokens").and_then(|v| v.as_u64()),
        ) {
            events.push(StreamEvent::Usage {
                input_tokens: input as u32,
                output_tokens: output as u32,
            });
        }
    }

    events
}

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

impl ApiRequest {
    fn from_chat(model: &str, request: &ChatRequest, stream: bool) -> Self {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !request.system.is_empty() {
            messages.push(ApiMessage {
                role: "system",
                content: request.system.clone(),
            });
        }
        for m in &request.messages {
            messages.push(ApiMessage {
                role: match m.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: m.content.clone(),
            });
        }

        Self {
            model: model.to_string(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
            stream_options: stream.then_some(StreamOptions {
                include_usage: true,
            }),
        }
    }
}
