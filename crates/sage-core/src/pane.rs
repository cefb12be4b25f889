//! Tmux pane history capture.
//!
//! Capture is only attempted inside a tmux session (`$TMUX` set). The tmux
//! invocations go through an injected runner so the capture logic is testable
//! without a real server.

use std::io;
use std::process::Command;
use std::str::FromStr;

/// Which pane(s) to capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaneTarget {
    Current,
    All,
    Id(String),
}

impl FromStr for PaneTarget {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "current" => PaneTarget::Current,
            "all" => PaneTarget::All,
            id => PaneTarget::Id(id.to_string()),
        })
    }
}

/// Runs a tmux subcommand and returns its stdout.
pub type TmuxRunner<'a> = dyn Fn(&[&str]) -> io::Result<String> + 'a;

/// Capture history from the requested pane(s).
///
/// Returns `Ok(None)` when not inside tmux (no warning, the query proceeds
/// without history). A failing tmux invocation is an `Err` so the caller can
/// warn and continue.
pub fn capture_history(lines: usize, target: &PaneTarget) -> io::Result<Option<String>> {
    if std::env::var_os("TMUX").is_none() {
        return Ok(None);
    }
    capture_with(&run_tmux, lines, target).map(Some)
}

fn capture_with(tmux: &TmuxRunner, lines: usize, target: &PaneTarget) -> io::Result<String> {
    match target {
        PaneTarget::Current => capture_pane(tmux, lines, None),
        PaneTarget::Id(id) => capture_pane(tmux, lines, Some(id)),
        PaneTarget::All => capture_all_panes(tmux, lines),
    }
}

fn capture_pane(tmux: &TmuxRunner, lines: usize, pane_id: Option<&str>) -> io::Result<String> {
    let depth = format!("-{lines}");
    let mut args = vec!["capture-pane", "-p", "-S", depth.as_str()];
    if let Some(id) = pane_id {
        args.push("-t");
        args.push(id);
    }
    tmux(&args)
}

/// Capture every pane in the window, tagging each and marking the active one.
fn capture_all_panes(tmux: &TmuxRunner, lines: usize) -> io::Result<String> {
    let current_id = tmux(&["display-message", "-p", "#{pane_id}"])?
        .trim()
        .to_string();
    let pane_list = tmux(&["list-panes", "-F", "#{pane_id}"])?;

    let mut outputs = Vec::new();
    for pane_id in pane_list.lines().filter(|l| !l.is_empty()) {
        let marker = if pane_id == current_id { "active" } else { "" };
        let output = capture_pane(tmux, lines, Some(pane_id))?;
        outputs.push(format!("<pane id={pane_id} {marker}>{output}</pane>"));
    }

    Ok(outputs.join("\n"))
}

fn run_tmux(args: &[&str]) -> io::Result<String> {
    let output = Command::new("tmux").args(args).output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(io::Error::other(format!(
            "tmux {} failed ({}): {}",
            args.first().unwrap_or(&""),
            output.status,
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
