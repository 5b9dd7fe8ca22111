//! Status command: read-only drift preview

use std::sync::Arc;

use async_trait::async_trait;
use colored::Colorize;
use forksync_core::config::ModelConfig;
use forksync_core::{ConflictResolver, DriftPreview, RepoLogger, Resolution};
use forksync_git::RepoClient;

use crate::context::Context;
use crate::error::Result;

/// Stand-in resolver; previews never merge.
struct NoResolver;

#[async_trait]
impl ConflictResolver for NoResolver {
    async fn resolve(
        &self,
        _repo: &dyn RepoClient,
        _conflicted: &[String],
        _model: &ModelConfig,
        _logger: &RepoLogger,
    ) -> Resolution {
        Resolution::failed("status does not merge")
    }
}

/// Show pending upstream commits for every pair.
///
/// Fetches upstream into existing working copies; nothing is merged or pushed.
pub async fn run_status(ctx: &Context, account: Option<&str>, json: bool) -> Result<()> {
    ctx.check_account(account)?;
    let engine = ctx.engine(Arc::new(NoResolver));

    let mut previews: Vec<(String, std::result::Result<DriftPreview, String>)> = Vec::new();
    for acct in &ctx.accounts {
        if account.is_some_and(|name| name != acct.name) {
            continue;
        }
        for pair in &acct.repos {
            let preview = engine
                .preview(acct, pair)
                .await
                .map_err(|e| e.to_string());
            previews.push((acct.name.clone(), preview));
        }
    }

    if json {
        let values: Vec<serde_json::Value> = previews
            .iter()
            .map(|(account, preview)| match preview {
                Ok(p) => serde_json::json!({ "account": account, "preview": p }),
                Err(e) => serde_json::json!({ "account": account, "error": e }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&values)?);
        return Ok(());
    }

    let mut current: Option<&str> = None;
    for (account, preview) in &previews {
        if current != Some(account.as_str()) {
            if current.is_some() {
                println!();
            }
            println!("{}", account.bold());
            current = Some(account.as_str());
        }
        match preview {
            Ok(p) if !p.present => {
                println!("  {} {} {}", "?".dimmed(), p.fork.cyan(), "not cloned yet".dimmed());
            }
            Ok(p) if p.pending.is_empty() => {
                println!("  {} {} {}", "=".dimmed(), p.fork.cyan(), "up to date".green());
            }
            Ok(p) => {
                println!(
                    "  {} {} {} behind {}",
                    "*".yellow(),
                    p.fork.cyan(),
                    p.pending.len().to_string().yellow(),
                    p.upstream
                );
                for commit in &p.pending {
                    println!("      {}", commit.dimmed());
                }
            }
            Err(e) => println!("  {} {}", "!".red(), e.red()),
        }
    }

    if previews.is_empty() {
        println!("{}", "No repositories configured".yellow());
    }
    Ok(())
}
