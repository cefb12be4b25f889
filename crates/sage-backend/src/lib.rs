//! sage-backend: LLM provider adapters for ShellSage.
//!
//! This crate provides a unified streaming interface over the Anthropic and
//! OpenAI chat APIs, plus the provider/model registry and a mock provider
//! for tests.

use sage_protocol::RequestError;
use thiserror::Error;

pub mod anthropic;
pub mod mock;
pub mod openai;
pub mod providers;
pub mod sse;

pub use anthropic::AnthropicClient;
pub use mock::{mock_stream, MockConfig, MockResponse};
pub use openai::OpenAiClient;
pub use providers::{Provider, ProviderError};

/// Errors from a provider adapter.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error(transparent)]
    InvalidRequest(#[from] RequestError),
}
