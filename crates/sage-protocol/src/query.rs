//! Query context assembly.
//!
//! A query carries up to three parts: captured terminal history, piped stdin,
//! and the user's question. They are composed into a single tagged prompt so
//! the model can tell them apart.

/// The pieces of a single `ssage` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryContext {
    pub terminal_history: Option<String>,
    pub piped_input: Option<String>,
    pub query: String,
}

impl QueryContext {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            terminal_history: None,
            piped_input: None,
            query: query.into(),
        }
    }

    pub fn with_terminal_history(mut self, history: impl Into<String>) -> Self {
        self.terminal_history = Some(history.into());
        self
    }

    pub fn with_piped_input(mut self, input: impl Into<String>) -> Self {
        self.piped_input = Some(input.into());
        self
    }

    /// Compose the tagged prompt sent as the user message.
    ///
    /// Absent parts are omitted entirely; the query tag always comes last.
    pub fn compose(&self) -> String {
        let mut parts = Vec::new();

        if let Some(ref history) = self.terminal_history {
            parts.push(format!("<terminal_history>\n{history}\n</terminal_history>"));
        }

        if let Some(ref piped) = self.piped_input {
            parts.push(format!("<context>\n{piped}</context>"));
        }

        parts.push(format!("<query>\n{}\n</query>", self.query));
        parts.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_query_only() {
        let ctx = QueryContext::new("how do I list open ports?");
        assert_eq!(
            ctx.compose(),
            "<query>\nhow do I list open ports?\n</query>"
        );
    }

    #[test]
    fn compose_with_history() {
        let ctx = QueryContext::new("what went wrong?")
            .with_terminal_history("$ make\nerror: missing separator");

        let prompt = ctx.compose();
        assert_eq!(
            prompt,
            "<terminal_history>\n$ make\nerror: missing separator\n</terminal_history>\n\
             <query>\nwhat went wrong?\n</query>"
        );
    }

    #[test]
    fn compose_with_piped_input() {
        let ctx = QueryContext::new("summarize this").with_piped_input("line one\nline two\n");

        let prompt = ctx.compose();
        assert_eq!(
            prompt,
            "<context>\nline one\nline two\n</context>\n<query>\nsummarize this\n</query>"
        );
    }

    #[test]
    fn compose_with_all_parts_orders_history_context_query() {
        let ctx = QueryContext::new("explain")
            .with_terminal_history("$ ls")
            .with_piped_input("data");

        let prompt = ctx.compose();
        let history_pos = prompt.find("<terminal_history>").unwrap();
        let context_pos = prompt.find("<context>").unwrap();
        let query_pos = prompt.find("<query>").unwrap();
        assert!(history_pos < context_pos);
        assert!(context_pos < query_pos);
    }

    #[test]
    fn compose_omits_absent_parts() {
        let ctx = QueryContext::new("hi");
        let prompt = ctx.compose();
        assert!(!prompt.contains("<terminal_history>"));
        assert!(!prompt.contains("<context>"));
    }
}
