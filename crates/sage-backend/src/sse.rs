//! Incremental Server-Sent Events parser.
//!
//! Both provider APIs stream responses as SSE. The parser here is a plain
//! synchronous state machine fed with byte chunks; `sse_events` wraps it
//! around an async byte stream.

use async_stream::stream;
use bytes::Bytes;
use futures::Stream;

/// A parsed SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// The event type (from the `event:` field). None if not specified.
    pub event_type: Option<String>,
    /// The event data (from `data:` field(s), joined with newlines).
    pub data: String,
}

/// Incremental parser over arbitrary chunk boundaries.
///
/// Feed raw bytes with [`SseParser::feed`]; call [`SseParser::finish`] at
/// end of input to flush a trailing event without a terminating blank line.
#[derive(Debug, Default)]
pub struct SseParser {
    line_buf: String,
    event_type: Option<String>,
    data_lines: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk of bytes, returning any events completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut events = Vec::new();
        for c in String::from_utf8_lossy(chunk).chars() {
            if c == '\n' {
                let line = std::mem::take(&mut self.line_buf);
                let line = line.strip_suffix('\r').unwrap_or(&line);
                if let Some(event) = self.take_line(line) {
                    events.push(event);
                }
            } else {
                self.line_buf.push(c);
            }
        }
        events
    }

    /// Flush any event still being accumulated at end of input.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.line_buf.is_empty() {
            let line = std::mem::take(&mut self.line_buf);
            if let Some(event) = self.take_line(&line) {
                return Some(event);
            }
        }
        if self.data_lines.is_empty() {
            return None;
        }
        Some(self.emit())
    }

    fn take_line(&mut self, line: &str) -> Option<SseEvent> {
        // Blank line terminates the current event.
        if line.is_empty() {
            if self.data_lines.is_empty() {
                return None;
            }
            return Some(self.emit());
        }

        match line.split_once(':') {
            Some((field, value)) => {
                // A single leading space in the value is part of the separator.
                let value = value.strip_prefix(' ').unwrap_or(value);
                match field {
                    "event" => self.event_type = Some(value.to_string()),
                    "data" => self.data_lines.push(value.to_string()),
                    // id, retry, and comments (empty field) are ignored
                    _ => {}
                }
            }
            // Lines without a colon are treated as a field with no value.
            None => {
                if line == "data" {
                    self.data_lines.push(String::new());
                }
            }
        }
        None
    }

    fn emit(&mut self) -> SseEvent {
        SseEvent {
            event_type: self.event_type.take(),
            data: std::mem::take(&mut self.data_lines).join("\n"),
        }
    }
}

/// Parse an async byte stream into SSE events.
///
/// Transport errors pass through and terminate the stream.
pub fn sse_events<S, E>(byte_stream: S) -> impl Stream<Item = Result<SseEvent, E>>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    stream! {
        let mut parser = SseParser::new();
        for await chunk in byte_stream {
            match chunk {
                Ok(bytes) => {
                    for event in parser.feed(&bytes) {
                        yield Ok(event);
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }
        if let Some(event) = parser.finish() {
            yield Ok(event);
        }
    }
}
