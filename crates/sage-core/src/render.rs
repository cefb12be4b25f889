//! Terminal markdown rendering for model responses.
//!
//! A small line-based renderer: headings, fenced code blocks, inline code,
//! bold spans, bullet lists, and horizontal rules. Color comes from the
//! selected code theme and honors NO_COLOR through [`Style`].

use std::str::FromStr;

use crossterm::terminal;
use thiserror::Error;

use crate::style::Style;

const MAX_RULE_WIDTH: usize = 40;

/// Horizontal rule width: the terminal width, capped.
fn detect_rule_width() -> usize {
    terminal::size()
        .map(|(cols, _)| (cols as usize).min(MAX_RULE_WIDTH))
        .unwrap_or(MAX_RULE_WIDTH)
}

/// Code block / inline code color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeTheme {
    Monokai,
    Dracula,
    Plain,
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown theme '{0}' (expected 'monokai', 'dracula', or 'plain')")]
pub struct UnknownTheme(pub String);

impl FromStr for CodeTheme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monokai" => Ok(CodeTheme::Monokai),
            "dracula" => Ok(CodeTheme::Dracula),
            "plain" => Ok(CodeTheme::Plain),
            other => Err(UnknownTheme(other.to_string())),
        }
    }
}

impl CodeTheme {
    /// 256-color code for code text, None for the plain theme.
    fn code_color(self) -> Option<u8> {
        match self {
            CodeTheme::Monokai => Some(186),
            CodeTheme::Dracula => Some(212),
            CodeTheme::Plain => None,
        }
    }
}

/// Renders markdown to a styled terminal string.
pub struct MarkdownRenderer {
    theme: CodeTheme,
    style: Style,
    rule_width: usize,
}

impl MarkdownRenderer {
    pub fn new(theme: CodeTheme, style: Style) -> Self {
        Self {
            theme,
            style,
            rule_width: detect_rule_width(),
        }
    }

    #[cfg(test)]
    fn with_rule_width(theme: CodeTheme, style: Style, rule_width: usize) -> Self {
        Self {
            theme,
            style,
            rule_width,
        }
    }

    pub fn render(&self, markdown: &str) -> String {
        let mut out = String::new();
        let mut in_code_block = false;

        for line in markdown.lines() {
            if line.trim_start().starts_with("```") {
                in_code_block = !in_code_block;
                continue;
            }

            if in_code_block {
                out.push_str("    ");
                out.push_str(&self.code_wrap(line));
            } else if let Some(text) = heading_text(line) {
                out.push_str(self.style.bold_start());
                out.push_str(&self.inline(text));
                out.push_str(self.style.reset());
            } else if is_rule(line) {
                out.push_str(self.style.dim_start());
                out.push_str(&"─".repeat(self.rule_width));
                out.push_str(self.style.reset());
            } else if let Some((indent, text)) = bullet_text(line) {
                out.push_str(indent);
                out.push_str("• ");
                out.push_str(&self.inline(text));
            } else {
                out.push_str(&self.inline(line));
            }
            out.push('\n');
        }

        out
    }

    fn code_wrap(&self, text: &str) -> String {
        match self.theme.code_color() {
            Some(color) if self.style.is_enabled() => {
                format!("{}{}{}", self.style.fg256(color), text, self.style.reset())
            }
            _ => text.to_string(),
        }
    }

    /// Apply inline code and bold spans within a single line.
    fn inline(&self, line: &str) -> String {
        let mut out = String::new();
        let mut rest = line;

        while let Some(start) = rest.find('`') {
            out.push_str(&self.bold_spans(&rest[..start]));
            let after = &rest[start + 1..];
            match after.find('`') {
                Some(end) => {
                    out.push_str(&self.code_wrap(&after[..end]));
                    rest = &after[end + 1..];
                }
                None => {
                    // Unbalanced backtick stays literal.
                    out.push('`');
                    rest = after;
                }
            }
        }
        out.push_str(&self.bold_spans(rest));
        out
    }

    fn bold_spans(&self, text: &str) -> String {
        let mut out = String::new();
        let mut rest = text;

        while let Some(start) = rest.find("**") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("**") {
                Some(end) => {
                    out.push_str(self.style.bold_start());
                    out.push_str(&after[..end]);
                    out.push_str(self.style.reset());
                    rest = &after[end + 2..];
                }
                None => {
                    out.push_str("**");
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

fn heading_text(line: &str) -> Option<&str> {
    let stripped = line.trim_start_matches('#');
    let level = line.len() - stripped.len();
    if (1..=6).contains(&level) && stripped.starts_with(' ') {
        Some(stripped.trim_start())
    } else {
        None
    }
}

fn is_rule(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3
        && (trimmed.chars().all(|c| c == '-') || trimmed.chars().all(|c| c == '*'))
}

fn bullet_text(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start();
    let indent = &line[..line.len() - trimmed.len()];
    for marker in ["- ", "* "] {
        if let Some(text) = trimmed.strip_prefix(marker) {
            return Some((indent, text));
        }
    }
    None
}
