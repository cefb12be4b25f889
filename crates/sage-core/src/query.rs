//! The query loop: request assembly, stream consumption, status output.
//!
//! All stderr formatting goes through `StatusLine<W: Write>` so tests can
//! capture it. TTY output uses a single overwritten status line; non-TTY
//! output stays quiet apart from warnings and errors.

use std::io::Write;

use futures::{Stream, StreamExt};
use sage_protocol::{ChatMessage, ChatRequest, QueryContext, StreamEvent};

use crate::prompts;
use crate::style::{format_tokens, Style};

/// Token counts accumulated across usage events.
///
/// Anthropic reports input tokens at message start and the final output count
/// in a later delta; OpenAI sends one usage chunk. Taking the maximum of each
/// field handles both shapes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    fn absorb(&mut self, input_tokens: u32, output_tokens: u32) {
        self.input_tokens = self.input_tokens.max(input_tokens);
        self.output_tokens = self.output_tokens.max(output_tokens);
    }

    pub fn is_empty(&self) -> bool {
        self.input_tokens == 0 && self.output_tokens == 0
    }
}

/// A completed streaming response.
#[derive(Debug, PartialEq)]
pub struct QueryOutcome {
    pub text: String,
    pub usage: TokenUsage,
}

/// Encapsulates all stderr output for a query.
pub struct StatusLine<W: Write> {
    writer: W,
    is_tty: bool,
    style: Style,
    active: bool,
}

impl<W: Write> StatusLine<W> {
    pub fn new(writer: W, is_tty: bool) -> Self {
        Self::with_style(writer, is_tty, Style::new())
    }

    pub fn with_style(writer: W, is_tty: bool, style: Style) -> Self {
        Self {
            writer,
            is_tty,
            style,
            active: false,
        }
    }

    /// Show the transient "asking" line (TTY only, overwritten later).
    pub fn emit_thinking(&mut self, model: &str) {
        if !self.is_tty {
            return;
        }
        let _ = write!(
            self.writer,
            "\r\x1b[K{}asking {model}...{}",
            self.style.dim_start(),
            self.style.reset()
        );
        let _ = self.writer.flush();
        self.active = true;
    }

    /// Clear the transient line if one is showing.
    pub fn clear(&mut self) {
        if self.active {
            let _ = write!(self.writer, "\r\x1b[K");
            let _ = self.writer.flush();
            self.active = false;
        }
    }

    /// Emit a persistent warning.
    pub fn emit_warning(&mut self, msg: &str) {
        self.clear();
        let _ = writeln!(
            self.writer,
            "{}warning: {msg}{}",
            self.style.yellow_start(),
            self.style.reset()
        );
    }

    /// Emit a persistent error.
    pub fn emit_error(&mut self, msg: &str) {
        self.clear();
        let _ = writeln!(
            self.writer,
            "{}error: {msg}{}",
            self.style.red_start(),
            self.style.reset()
        );
    }

    /// Emit the verbose usage footer, e.g. `1.2k↑ 500↓ claude-3-5-sonnet-20241022 $0.0123`.
    pub fn emit_footer(&mut self, usage: &TokenUsage, model: &str, cost_usd: Option<f64>) {
        self.clear();
        let cost = match cost_usd {
            Some(c) => format!(" ${c:.4}"),
            None => String::new(),
        };
        let _ = writeln!(
            self.writer,
            "{}{}↑ {}↓ {model}{cost}{}",
            self.style.dim_start(),
            format_tokens(usage.input_tokens),
            format_tokens(usage.output_tokens),
            self.style.reset()
        );
    }
}

/// Build the chat request for a composed query.
pub fn build_chat_request(ctx: &QueryContext, sassy: bool, model: &str) -> ChatRequest {
    let system = if sassy {
        prompts::SASSY
    } else {
        prompts::TEACHING
    };
    ChatRequest::new(model)
        .with_system(system)
        .with_messages(vec![ChatMessage::user(ctx.compose())])
        .with_temperature(0.7)
        .with_max_tokens(4096)
        .streaming()
}

/// Drain the event stream into the final text and usage totals.
///
/// A stream error aborts the query; its message becomes the error value.
pub async fn collect_response<S, W>(
    stream: S,
    status: &mut StatusLine<W>,
) -> Result<QueryOutcome, String>
where
    S: Stream<Item = StreamEvent>,
    W: Write,
{
    let mut stream = std::pin::pin!(stream);
    let mut text = String::new();
    let mut usage = TokenUsage::default();

    while let Some(event) = stream.next().await {
        match event {
            StreamEvent::TextDelta(chunk) => text.push_str(&chunk),
            StreamEvent::Usage {
                input_tokens,
                output_tokens,
            } => usage.absorb(input_tokens, output_tokens),
            StreamEvent::Error(message) => {
                status.clear();
                return Err(message);
            }
            StreamEvent::Done => break,
        }
    }

    status.clear();
    Ok(QueryOutcome { text, usage })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sage_backend::mock::{fixtures, mock_stream, MockConfig, MockResponse};

    fn status_buf(is_tty: bool) -> StatusLine<Vec<u8>> {
        StatusLine::with_style(Vec::new(), is_tty, Style::force_enabled())
    }

    fn written(status: &StatusLine<Vec<u8>>) -> String {
        String::from_utf8_lossy(&status.writer).to_string()
    }

    #[test]
    fn usage_absorb_takes_maxima() {
        let mut usage = TokenUsage::default();
        usage.absorb(321, 1);
        usage.absorb(0, 187);
        assert_eq!(usage.input_tokens, 321);
        assert_eq!(usage.output_tokens, 187);
    }

    #[test]
    fn build_request_teaching_persona() {
        let ctx = QueryContext::new("how do I use sed?");
        let req = build_chat_request(&ctx, false, "claude-3-5-sonnet-20241022");

        assert_eq!(req.model, "claude-3-5-sonnet-20241022");
        assert!(req.system.contains("teaching assistant"));
        assert!(!req.system.contains("GLaDOS"));
        assert_eq!(req.temperature, 0.7);
        assert_eq!(req.max_tokens, 4096);
        assert!(req.stream);
        assert_eq!(req.messages.len(), 1);
        assert!(req.messages[0].content.contains("<query>\nhow do I use sed?\n</query>"));
        assert_eq!(req.validate(), Ok(()));
    }

    #[test]
    fn build_request_sassy_persona() {
        let ctx = QueryContext::new("hi");
        let req = build_chat_request(&ctx, true, "gpt-4o");
        assert!(req.system.contains("GLaDOS"));
    }

    #[test]
    fn build_request_includes_history_and_piped_input() {
        let ctx = QueryContext::new("what failed?")
            .with_terminal_history("$ make\nerror")
            .with_piped_input("Makefile contents");
        let req = build_chat_request(&ctx, false, "m");
        let content = &req.messages[0].content;
        assert!(content.contains("<terminal_history>"));
        assert!(content.contains("<context>"));
    }

    #[tokio::test]
    async fn collect_accumulates_text_and_usage() {
        let config = MockConfig::new().with_responses(vec![
            MockResponse::Usage {
                input_tokens: 300,
                output_tokens: 1,
            },
            MockResponse::Text {
                content: "Use ".to_string(),
            },
            MockResponse::Text {
                content: "`lsof`.".to_string(),
            },
            MockResponse::Usage {
                input_tokens: 0,
                output_tokens: 12,
            },
        ]);

        let mut status = status_buf(false);
        let outcome = collect_response(mock_stream(config), &mut status)
            .await
            .unwrap();

        assert_eq!(outcome.text, "Use `lsof`.");
        assert_eq!(
            outcome.usage,
            TokenUsage {
                input_tokens: 300,
                output_tokens: 12
            }
        );
    }

    #[tokio::test]
    async fn collect_surfaces_stream_error() {
        let mut status = status_buf(false);
        let err = collect_response(
            mock_stream(fixtures::error_mid_stream("partial", "Rate limited")),
            &mut status,
        )
        .await
        .unwrap_err();

        assert_eq!(err, "Rate limited");
    }

    #[tokio::test]
    async fn collect_with_markdown_fixture() {
        let mut status = status_buf(false);
        let outcome = collect_response(mock_stream(fixtures::markdown_response()), &mut status)
            .await
            .unwrap();

        assert!(outcome.text.contains("```\nls -la\n```"));
        assert!(!outcome.usage.is_empty());
    }

    #[test]
    fn thinking_is_tty_only() {
        let mut status = status_buf(false);
        status.emit_thinking("m");
        assert_eq!(written(&status), "");

        let mut status = status_buf(true);
        status.emit_thinking("claude-3-5-sonnet-20241022");
        let s = written(&status);
        assert!(s.starts_with("\r\x1b[K"));
        assert!(s.contains("asking claude-3-5-sonnet-20241022..."));
        assert!(!s.ends_with('\n'));
    }

    #[test]
    fn clear_overwrites_active_line_only() {
        let mut status = status_buf(true);
        status.clear();
        assert_eq!(written(&status), "");

        status.emit_thinking("m");
        status.clear();
        assert!(written(&status).ends_with("\r\x1b[K"));
    }

    #[test]
    fn warning_and_error_persist() {
        let mut status = status_buf(true);
        status.emit_thinking("m");
        status.emit_warning("failed to capture tmux history");
        status.emit_error("connection refused");

        let s = written(&status);
        assert!(s.contains("\x1b[33mwarning: failed to capture tmux history"));
        assert!(s.contains("\x1b[31merror: connection refused"));
    }

    #[test]
    fn footer_formats_tokens_and_cost() {
        let mut status = status_buf(true);
        let usage = TokenUsage {
            input_tokens: 1200,
            output_tokens: 500,
        };
        status.emit_footer(&usage, "claude-3-5-sonnet-20241022", Some(0.0111));

        let s = written(&status);
        assert!(s.contains("1.2k↑ 500↓ claude-3-5-sonnet-20241022 $0.0111"));
    }

    #[test]
    fn footer_omits_cost_when_unpriced() {
        let mut status = status_buf(false);
        let usage = TokenUsage {
            input_tokens: 250,
            output_tokens: 90,
        };
        status.emit_footer(&usage, "gpt-4o", None);

        let s = written(&status);
        assert!(s.contains("250↑ 90↓ gpt-4o"));
        assert!(!s.contains('$'));
    }
}
