//! End-to-end tests for the `ssage` binary.
//!
//! These only exercise paths that fail before any network request: help
//! output, argument validation, and key resolution.

use std::process::{Command, Output};

fn ssage() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ssage"));
    // Isolate from the developer's real config and keys.
    let dir = std::env::temp_dir().join(format!("ssage-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    cmd.env("HOME", &dir)
        .env("XDG_CONFIG_HOME", dir.join("config"))
        .env("XDG_DATA_HOME", dir.join("data"))
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .env_remove("TMUX")
        .stdin(std::process::Stdio::null());
    cmd
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn help_names_shellsage() {
    let output = ssage().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ShellSage"));
    assert!(stdout.contains("--sassy"));
}

#[test]
fn version_flag_works() {
    let output = ssage().arg("--version").output().unwrap();
    assert!(output.status.success());
}

#[test]
fn empty_query_is_an_error() {
    let output = ssage().output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("no query provided"));
}

#[test]
fn invalid_model_fails_without_network() {
    let output = ssage()
        .args(["--provider", "anthropic", "--model", "bogus-model", "hello"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("Invalid model 'bogus-model'"));
    assert!(stderr.contains("claude-3-5-sonnet-20241022"));
}

#[test]
fn unknown_provider_is_an_error() {
    let output = ssage()
        .args(["--provider", "cohere", "hello"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).to_lowercase().contains("provider"));
}

#[test]
fn missing_api_key_lists_remedies() {
    let output = ssage().arg("hello").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("API key not found"));
    assert!(stderr.contains("ssage setup"));
    assert!(stderr.contains("ANTHROPIC_API_KEY"));
}
