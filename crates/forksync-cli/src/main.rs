//! forksync CLI
//!
//! Keeps forks in sync with their upstreams: merges upstream changes, hands
//! conflicts to a model-backed resolver, and reports the results.

mod cli;
mod commands;
mod context;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use context::Context;
use error::Result;

const CRATES: [&str; 4] = ["forksync_cli", "forksync_core", "forksync_git", "forksync_resolver"];

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

/// Log to stderr; stdout carries command output and `--json`.
///
/// `RUST_LOG` wins over `--verbose` when set.
fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives: Vec<String> = CRATES.iter().map(|c| format!("{c}={level}")).collect();
        EnvFilter::new(directives.join(","))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns `Ok(false)` when the command ran but reported failures.
async fn run(cli: Cli) -> Result<bool> {
    let ctx = Context::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { selection, json } => commands::run_sync(&ctx, &selection, json).await,
        Commands::Watch { selection } => {
            commands::run_watch(&ctx, &selection).await?;
            Ok(true)
        }
        Commands::CheckConfig => {
            commands::run_check_config(&ctx)?;
            Ok(true)
        }
        Commands::Status { account, json } => {
            commands::run_status(&ctx, account.as_deref(), json).await?;
            Ok(true)
        }
    }
}
