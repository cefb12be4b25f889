//! Chat request and streaming event types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role in a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single message in a chat exchange.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
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

/// Validation failure for a [`ChatRequest`].
#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("temperature must be between 0 and 1, got {0}")]
    Temperature(f32),
    #[error("max_tokens must be at least 1, got {0}")]
    MaxTokens(u32),
    #[error("messages cannot be empty")]
    EmptyMessages,
}

/// A complete chat request for a provider adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: String::new(),
            messages: Vec::new(),
            temperature: 0.0,
            max_tokens: 4096,
            stream: false,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }

    /// Check that the request is well-formed before any network call.
    pub fn validate(&self) -> Result<(), RequestError> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(RequestError::Temperature(self.temperature));
        }
        if self.max_tokens < 1 {
            return Err(RequestError::MaxTokens(self.max_tokens));
        }
        if self.messages.is_empty() {
            return Err(RequestError::EmptyMessages);
        }
        Ok(())
    }
}

/// Events emitted while consuming a streaming response.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A chunk of response text.
    TextDelta(String),

    /// Token usage information.
    Usage {
        input_tokens: u32,
        output_tokens: u32,
    },

    /// Stream has completed successfully.
    Done,

    /// An error occurred during streaming.
    Error(String),
}
