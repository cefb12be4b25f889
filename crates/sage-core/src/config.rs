use std::path::PathBuf;

use sage_backend::Provider;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub history: HistoryConfig,
    pub provider: ProviderConfig,
    pub render: RenderConfig,
    pub usage: UsageConfig,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    /// Number of terminal history lines to capture.
    pub lines: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { lines: 200 }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    /// Which provider to use by default.
    pub default: String,
    pub anthropic: ModelConfig,
    pub openai: ModelConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            default: "anthropic".to_string(),
            anthropic: ModelConfig::default(),
            openai: ModelConfig::default(),
        }
    }
}

impl ProviderConfig {
    pub fn for_provider(&self, provider: Provider) -> &ModelConfig {
        match provider {
            Provider::Anthropic => &self.anthropic,
            Provider::OpenAi => &self.openai,
        }
    }
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Model to use instead of the provider default.
    pub model: Option<String>,
    /// Command to run to get the API key (e.g. a keychain lookup).
    /// The command is run via `sh -c`.
    pub api_key_cmd: Option<String>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Code theme for responses.
    pub code_theme: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            code_theme: "monokai".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct UsageConfig {
    /// Append per-query usage records to the usage log.
    pub log: bool,
}

impl Config {
    pub fn load_or_default() -> Self {
        let path = config_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                eprintln!("warning: failed to parse {}: {e}", path.display());
                Config::default()
            }),
            Err(_) => Config::default(),
        }
    }
}

/// `$XDG_CONFIG_HOME/shell_sage` (or `~/.config/shell_sage`).
pub fn config_dir() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("shell_sage")
}

/// `$XDG_DATA_HOME/shell_sage` (or `~/.local/share/shell_sage`).
pub fn data_dir() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("shell_sage")
}

fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}
