use std::io::{self, IsTerminal, Read, Write};

use clap::Parser;

use sage_backend::{providers, AnthropicClient, OpenAiClient, Provider};
use sage_core::cli::{Cli, Command};
use sage_core::config::Config;
use sage_core::credentials;
use sage_core::pane::{self, PaneTarget};
use sage_core::query::{build_chat_request, collect_response, StatusLine};
use sage_core::render::{CodeTheme, MarkdownRenderer};
use sage_core::style::Style;
use sage_core::usage::{default_usage_path, UsageLogger};
use sage_protocol::QueryContext;

fn main() {
    let cli = Cli::parse();
    let config = Config::load_or_default();

    let result = match cli.command {
        Some(Command::Setup { ref provider }) => run_setup(&config, provider.as_deref()),
        None => run_query(&cli, &config),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Prompt for an API key on stdin and store it in the credentials file.
fn run_setup(config: &Config, provider: Option<&str>) -> Result<(), String> {
    let provider: Provider = provider
        .unwrap_or(&config.provider.default)
        .parse()
        .map_err(|e: sage_backend::ProviderError| e.to_string())?;

    eprint!("Enter {provider} API key: ");
    let _ = io::stderr().flush();

    let mut key = String::new();
    io::stdin()
        .read_line(&mut key)
        .map_err(|e| format!("failed to read API key: {e}"))?;

    credentials::save_api_key(provider, &key).map_err(|e| e.to_string())?;
    eprintln!(
        "Stored {provider} API key in {}",
        credentials::credentials_path().display()
    );
    Ok(())
}

fn run_query(cli: &Cli, config: &Config) -> Result<(), String> {
    let query = cli.query.join(" ");
    if query.trim().is_empty() {
        return Err("no query provided (try: ssage how do I list open ports)".to_string());
    }

    let provider: Provider = cli
        .provider
        .as_deref()
        .unwrap_or(&config.provider.default)
        .parse()
        .map_err(|e: sage_backend::ProviderError| e.to_string())?;

    let model_cfg = config.provider.for_provider(provider);
    let model = cli
        .model
        .clone()
        .or_else(|| model_cfg.model.clone())
        .unwrap_or_else(|| providers::default_model(provider).to_string());

    // Validate before touching credentials or the network.
    providers::validate_model(provider, &model).map_err(|e| e.to_string())?;

    let api_key = credentials::resolve_api_key(provider, model_cfg).map_err(|e| e.to_string())?;

    let stderr_tty = io::stderr().is_terminal();
    let mut status = StatusLine::new(io::stderr(), stderr_tty);

    let theme_name = cli.theme.as_deref().unwrap_or(&config.render.code_theme);
    let theme: CodeTheme = theme_name.parse().unwrap_or_else(|e| {
        status.emit_warning(&format!("{e}, falling back to plain"));
        CodeTheme::Plain
    });

    let mut ctx = QueryContext::new(query);

    if !cli.no_history {
        let lines = cli.lines.unwrap_or(config.history.lines);
        let target: PaneTarget = cli.pid.parse().unwrap_or(PaneTarget::Current);
        match pane::capture_history(lines, &target) {
            Ok(Some(history)) => ctx = ctx.with_terminal_history(history),
            Ok(None) => {} // not inside tmux
            Err(e) => status.emit_warning(&format!("failed to capture terminal history: {e}")),
        }
    }

    if !io::stdin().is_terminal() {
        let mut piped = String::new();
        if io::stdin().read_to_string(&mut piped).is_ok() && !piped.trim().is_empty() {
            ctx = ctx.with_piped_input(piped);
        }
    }

    let request = build_chat_request(&ctx, cli.sassy, &model);

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("failed to create async runtime: {e}"))?;

    status.emit_thinking(&model);

    let result = runtime.block_on(async {
        match provider {
            Provider::Anthropic => {
                let client = AnthropicClient::with_model(api_key.as_str(), model.as_str());
                collect_response(client.send(&request), &mut status).await
            }
            Provider::OpenAi => {
                let client = OpenAiClient::with_model(api_key.as_str(), model.as_str());
                collect_response(client.send(&request), &mut status).await
            }
        }
    });
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(message) => {
            status.emit_error(&message);
            std::process::exit(1);
        }
    };

    let renderer = MarkdownRenderer::new(theme, Style::new());
    print!("{}", renderer.render(&outcome.text));
    let _ = io::stdout().flush();

    let cost = providers::cost_usd(&model, outcome.usage.input_tokens, outcome.usage.output_tokens);

    if cli.verbose {
        status.emit_footer(&outcome.usage, &model, cost);
    }

    let mut logger = if config.usage.log {
        UsageLogger::new(&default_usage_path()).unwrap_or_else(|e| {
            status.emit_warning(&format!("failed to open usage log: {e}"));
            UsageLogger::noop()
        })
    } else {
        UsageLogger::noop()
    };
    logger.log_query(
        &model,
        outcome.usage.input_tokens,
        outcome.usage.output_tokens,
        cost,
    );

    Ok(())
}
