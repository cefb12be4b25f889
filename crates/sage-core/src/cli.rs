//! Command-line interface definition.

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "ssage",
    version,
    about = "ShellSage - Your CLI Teaching Assistant",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// The query to send to ShellSage
    pub query: Vec<String>,

    /// Tmux pane to capture: 'current', 'all', or a specific pane id
    #[arg(long, default_value = "current")]
    pub pid: String,

    /// Number of history lines to capture (defaults to config value)
    #[arg(short = 'n', long = "lines")]
    pub lines: Option<usize>,

    /// Skip terminal history context
    #[arg(long = "NH")]
    pub no_history: bool,

    /// Enable sassy mode
    #[arg(short, long)]
    pub sassy: bool,

    /// Provider to use: anthropic or openai (overrides config)
    #[arg(long)]
    pub provider: Option<String>,

    /// Model override (must be valid for the provider)
    #[arg(long)]
    pub model: Option<String>,

    /// Code theme for responses (defaults to config value)
    #[arg(long)]
    pub theme: Option<String>,

    /// Enable verbose output (token usage footer on stderr)
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store an API key in the credentials file
    Setup {
        /// Provider to store the key for (defaults to the configured default)
        #[arg(long)]
        provider: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_plain_query() {
        let cli = Cli::parse_from(["ssage", "how", "do", "I", "use", "tar"]);
        assert_eq!(cli.query, vec!["how", "do", "I", "use", "tar"]);
        assert_eq!(cli.pid, "current");
        assert!(cli.lines.is_none());
        assert!(!cli.no_history);
        assert!(!cli.sassy);
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::parse_from([
            "ssage", "--pid", "%3", "-n", "50", "--NH", "-s", "--provider", "openai", "--model",
            "gpt-4o", "--theme", "dracula", "-v", "explain",
        ]);
        assert_eq!(cli.pid, "%3");
        assert_eq!(cli.lines, Some(50));
        assert!(cli.no_history);
        assert!(cli.sassy);
        assert_eq!(cli.provider.as_deref(), Some("openai"));
        assert_eq!(cli.model.as_deref(), Some("gpt-4o"));
        assert_eq!(cli.theme.as_deref(), Some("dracula"));
        assert!(cli.verbose);
        assert_eq!(cli.query, vec!["explain"]);
    }

    #[test]
    fn parses_setup_subcommand() {
        let cli = Cli::parse_from(["ssage", "setup", "--provider", "anthropic"]);
        match cli.command {
            Some(Command::Setup { provider }) => {
                assert_eq!(provider.as_deref(), Some("anthropic"));
            }
            other => panic!("expected setup subcommand, got {other:?}"),
        }
    }

    #[test]
    fn about_names_shellsage() {
        let cmd = Cli::command();
        let about = cmd.get_about().map(|s| s.to_string()).unwrap_or_default();
        assert!(about.contains("ShellSage"));
    }
}
