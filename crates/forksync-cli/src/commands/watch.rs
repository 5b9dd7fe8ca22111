//! Watch command: serialized periodic runs

use colored::Colorize;
use forksync_core::{BatchResult, RunLock};

use super::run::{print_summary, run_once};
use crate::cli::Selection;
use crate::context::Context;
use crate::error::Result;

/// Run, sleep `run.interval_secs`, repeat until Ctrl-C.
///
/// The lock is held for the whole loop so a concurrent `forksync run`
/// cannot interleave with a pass.
pub async fn run_watch(ctx: &Context, selection: &Selection) -> Result<()> {
    ctx.check_account(selection.account.as_deref())?;
    let orchestrator = ctx.orchestrator()?;
    let interval = ctx.config.run.interval();

    let _lock = RunLock::acquire(&ctx.workdir_root())?;
    tracing::info!(interval_secs = interval.as_secs(), "Watching");

    loop {
        let results = run_once(ctx, &orchestrator, selection).await;
        for summary in results.iter().filter_map(BatchResult::summary) {
            print_summary(summary);
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    tracing::warn!(error = %e, "Could not listen for Ctrl-C");
                }
                println!("{}", "Stopping".dimmed());
                return Ok(());
            }
        }
    }
}
