//! Append-only JSONL usage logger.
//!
//! When `[usage] log = true` is set, one JSON object per query is appended to
//! the usage log. Logging failures never fail the query.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::data_dir;

/// `$XDG_DATA_HOME/shell_sage/usage.jsonl`.
pub fn default_usage_path() -> PathBuf {
    data_dir().join("usage.jsonl")
}

/// Append-only JSONL usage logger.
pub struct UsageLogger {
    writer: Option<BufWriter<File>>,
    session_id: String,
}

impl UsageLogger {
    /// Create a logger writing to the given path, creating parent directories
    /// as needed.
    pub fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            session_id: generate_session_id(),
        })
    }

    /// Create a no-op logger that discards all records.
    pub fn noop() -> Self {
        Self {
            writer: None,
            session_id: generate_session_id(),
        }
    }

    /// Record one completed query.
    pub fn log_query(
        &mut self,
        model: &str,
        input_tokens: u32,
        output_tokens: u32,
        cost_usd: Option<f64>,
    ) {
        self.write_record(serde_json::json!({
            "ts": epoch_secs(),
            "session": self.session_id,
            "model": model,
            "input_tokens": input_tokens,
            "output_tokens": output_tokens,
            "cost_usd": cost_usd,
        }));
    }

    fn write_record(&mut self, value: serde_json::Value) {
        if let Some(ref mut writer) = self.writer {
            if let Ok(line) = serde_json::to_string(&value) {
                let _ = writeln!(writer, "{line}");
                let _ = writer.flush();
            }
        }
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn generate_session_id() -> String {
    let pid = std::process::id();
    let ts = epoch_secs();
    format!("s{:x}", pid ^ (ts as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_log_lines(path: &Path) -> Vec<serde_json::Value> {
        let content = std::fs::read_to_string(path).unwrap();
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn new_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shell_sage").join("usage.jsonl");
        let _logger = UsageLogger::new(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn noop_logger_discards() {
        let mut logger = UsageLogger::noop();
        logger.log_query("claude-3-5-sonnet-20241022", 300, 120, Some(0.0027));
    }

    #[test]
    fn log_query_writes_valid_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.jsonl");
        let mut logger = UsageLogger::new(&path).unwrap();

        logger.log_query("claude-3-5-sonnet-20241022", 300, 120, Some(0.0027));

        let lines = read_log_lines(&path);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["model"], "claude-3-5-sonnet-20241022");
        assert_eq!(lines[0]["input_tokens"], 300);
        assert_eq!(lines[0]["output_tokens"], 120);
        assert!((lines[0]["cost_usd"].as_f64().unwrap() - 0.0027).abs() < 1e-9);
        assert!(lines[0]["ts"].as_u64().unwrap() > 0);
    }

    #[test]
    fn unpriced_model_logs_null_cost() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.jsonl");
        let mut logger = UsageLogger::new(&path).unwrap();

        logger.log_query("gpt-4o", 100, 50, None);

        let lines = read_log_lines(&path);
        assert!(lines[0]["cost_usd"].is_null());
    }

    #[test]
    fn multiple_entries_append_with_same_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.jsonl");
        let mut logger = UsageLogger::new(&path).unwrap();

        logger.log_query("a", 1, 2, None);
        logger.log_query("b", 3, 4, None);

        let lines = read_log_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["session"], lines[1]["session"]);
    }

    #[test]
    fn default_path_ends_with_usage_jsonl() {
        assert!(default_usage_path()
            .to_string_lossy()
            .ends_with("usage.jsonl"));
    }
}
