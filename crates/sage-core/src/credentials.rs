//! Credential storage and API key resolution.
//!
//! Keys live in a JSON file under the config directory, created with owner-only
//! permissions. Resolution order for a query: environment variable, then the
//! configured `api_key_cmd`, then the credentials file.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use sage_backend::Provider;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{config_dir, ModelConfig};

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("API key cannot be empty")]
    EmptyKey,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Missing-key error with the remediation steps spelled out.
#[derive(Debug, Error)]
#[error(
    "{provider} API key not found. Please either:\n\
     1. Run 'ssage setup' to store your API key\n\
     2. Set the {env_var} environment variable\n\
     3. Configure provider.{provider}.api_key_cmd in config.toml"
)]
pub struct MissingKey {
    provider: Provider,
    env_var: &'static str,
}

/// Stored API keys, one per provider.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Credentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
}

impl Credentials {
    pub fn key_for(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Anthropic => self.anthropic_api_key.as_deref(),
            Provider::OpenAi => self.openai_api_key.as_deref(),
        }
    }

    fn set_key(&mut self, provider: Provider, key: String) {
        match provider {
            Provider::Anthropic => self.anthropic_api_key = Some(key),
            Provider::OpenAi => self.openai_api_key = Some(key),
        }
    }
}

/// Environment variable consulted first for a provider's key.
pub fn env_var(provider: Provider) -> &'static str {
    match provider {
        Provider::Anthropic => "ANTHROPIC_API_KEY",
        Provider::OpenAi => "OPENAI_API_KEY",
    }
}

pub fn credentials_path() -> PathBuf {
    config_dir().join("credentials.json")
}

/// Load stored credentials. A missing or corrupted file reads as empty.
pub fn load() -> Credentials {
    load_from(&credentials_path())
}

fn load_from(path: &Path) -> Credentials {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|contents| serde_json::from_str(&contents).ok())
        .unwrap_or_default()
}

/// Store an API key, preserving keys for other providers.
/// The directory is created 0700 and the file written 0600.
pub fn save_api_key(provider: Provider, key: &str) -> Result<(), CredentialsError> {
    save_api_key_to(&credentials_path(), provider, key)
}

fn save_api_key_to(path: &Path, provider: Provider, key: &str) -> Result<(), CredentialsError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(CredentialsError::EmptyKey);
    }

    // A corrupted existing file starts fresh rather than failing the save.
    let mut credentials = load_from(path);
    credentials.set_key(provider, key.to_string());

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
        set_mode(parent, 0o700)?;
    }

    let json = serde_json::to_string(&credentials).map_err(io::Error::other)?;
    std::fs::write(path, json)?;
    set_mode(path, 0o600)?;
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

/// Resolve the API key for a provider: env var, then `api_key_cmd`, then the
/// credentials file.
pub fn resolve_api_key(provider: Provider, cfg: &ModelConfig) -> Result<String, MissingKey> {
    resolve_with(
        &|name| std::env::var(name).ok(),
        cfg,
        load().key_for(provider).map(str::to_string),
        provider,
    )
}

fn resolve_with(
    env: &dyn Fn(&str) -> Option<String>,
    cfg: &ModelConfig,
    stored: Option<String>,
    provider: Provider,
) -> Result<String, MissingKey> {
    let var = env_var(provider);

    if let Some(key) = env(var).filter(|k| !k.trim().is_empty()) {
        return Ok(key.trim().to_string());
    }

    if let Some(cmd) = &cfg.api_key_cmd {
        if let Some(key) = run_key_cmd(cmd) {
            return Ok(key);
        }
    }

    if let Some(key) = stored.filter(|k| !k.trim().is_empty()) {
        return Ok(key.trim().to_string());
    }

    Err(MissingKey {
        provider,
        env_var: var,
    })
}

fn run_key_cmd(cmd: &str) -> Option<String> {
    let output = Command::new("sh").arg("-c").arg(cmd).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let key = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}
