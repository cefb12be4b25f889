use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod formula;
mod tag;

#[derive(Debug, Parser)]
#[command(name = "xtask", about = "Release and packaging tasks for ShellSage")]
struct Cli {
    /// Path to the packaging recipe.
    #[arg(long, default_value = "dist/formula.toml")]
    formula: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the next release tag (increments the highest v0.0.<n>).
    NextTag,
    /// Download the pinned resources and verify their checksums.
    Fetch {
        #[arg(long, default_value = "target/xtask/vendor")]
        cache: PathBuf,
    },
    /// Build ssage and install it with its resources under a prefix.
    Install {
        #[arg(long)]
        prefix: PathBuf,
        #[arg(long, default_value = "target/xtask/vendor")]
        cache: PathBuf,
    },
    /// Run the installed binary's self-test.
    Check {
        #[arg(long)]
        prefix: PathBuf,
    },
    /// Recompute a resource's sha256 pin from a local file.
    Pin { resource: String, file: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::NextTag => {
            let tags = tag::git_tags()?;
            println!("{}", tag::next_tag(&tags));
        }
        Command::Fetch { cache } => {
            let formula = formula::load(&cli.formula)?;
            formula::fetch(&formula, &cache)?;
        }
        Command::Install { prefix, cache } => {
            let formula = formula::load(&cli.formula)?;
            formula::install(&formula, &cache, &prefix)?;
        }
        Command::Check { prefix } => {
            let formula = formula::load(&cli.formula)?;
            formula::check(&formula, &prefix)?;
        }
        Command::Pin { resource, file } => {
            formula::pin(&cli.formula, &resource, &file)?;
        }
    }
    Ok(())
}
