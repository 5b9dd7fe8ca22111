//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// forksync - Keep forks in sync with their upstreams
#[derive(Parser, Debug)]
#[command(name = "forksync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./forksync.toml, then the user config dir)
    #[arg(short, long, global = true, env = "FORKSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Account and repository selectors
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Only this account
    #[arg(short, long)]
    pub account: Option<String>,

    /// Only the pair whose upstream or fork is this `owner/repo:branch`
    #[arg(short, long)]
    pub repo: Option<String>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Synchronize every configured fork once
    ///
    /// Exits with status 1 if any account's batch had a failure.
    Run {
        #[command(flatten)]
        selection: Selection,

        /// Print batch summaries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Synchronize repeatedly, sleeping `run.interval_secs` between runs
    ///
    /// Runs never overlap. Ctrl-C stops the loop after the current run.
    Watch {
        #[command(flatten)]
        selection: Selection,
    },

    /// Load and validate the configuration, then list the configured pairs
    CheckConfig,

    /// Show pending upstream commits per pair without merging
    Status {
        /// Only this account
        #[arg(short, long)]
        account: Option<String>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}
