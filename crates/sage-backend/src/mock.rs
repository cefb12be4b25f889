//! Scripted event streams for tests.
//!
//! A mock stream plays back a fixed response script and then yields `Done`,
//! exactly the sequence shape the real adapters produce, so the query loop
//! and renderer can be exercised without HTTP.

use async_stream::stream;
use futures::Stream;
use sage_protocol::StreamEvent;

/// One scripted step of a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Text { content: String },
    Usage {
        input_tokens: u32,
        output_tokens: u32,
    },
    Error { message: String },
}

/// A response script for [`mock_stream`].
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    pub responses: Vec<MockResponse>,
}

impl MockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(mut self, responses: Vec<MockResponse>) -> Self {
        self.responses = responses;
        self
    }
}

/// Play back the script as a `StreamEvent` stream, ending with `Done`.
pub fn mock_stream(config: MockConfig) -> impl Stream<Item = StreamEvent> {
    stream! {
        for response in config.responses {
            yield match response {
                MockResponse::Text { content } => StreamEvent::TextDelta(content),
                MockResponse::Usage { input_tokens, output_tokens } => {
                    StreamEvent::Usage { input_tokens, output_tokens }
                }
                MockResponse::Error { message } => StreamEvent::Error(message),
            };
        }
        yield StreamEvent::Done;
    }
}

/// Ready-made scripts for common scenarios.
pub mod fixtures {
    use super::*;

    /// A typical teaching answer: prose, a fenced command block, usage.
    pub fn markdown_response() -> MockConfig {
        MockConfig::new().with_responses(vec![
            MockResponse::Usage {
                input_tokens: 250,
                output_tokens: 1,
            },
            MockResponse::Text {
                content: "# Listing files\n\nUse `ls` with flags:\n\n".to_string(),
            },
            MockResponse::Text {
                content: "```\nls -la\n```\n\n- `-l` long format\n- `-a` show hidden\n".to_string(),
            },
            MockResponse::Usage {
                input_tokens: 0,
                output_tokens: 42,
            },
        ])
    }

    /// Stream text split into arbitrary chunks.
    pub fn streaming_text(chunks: &[&str]) -> MockConfig {
        let responses = chunks
            .iter()
            .map(|chunk| MockResponse::Text {
                content: (*chunk).to_string(),
            })
            .collect();

        MockConfig::new().with_responses(responses)
    }

    /// A stream that errors after emitting some text.
    pub fn error_mid_stream(text_before: &str, error: &str) -> MockConfig {
        MockConfig::new().with_responses(vec![
            MockResponse::Text {
                content: text_before.to_string(),
            },
            MockResponse::Error {
                message: error.to_string(),
            },
        ])
    }
}
