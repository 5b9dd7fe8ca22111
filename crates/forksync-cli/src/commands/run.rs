//! Run command: one pass over every selected account

use colored::Colorize;
use forksync_core::{
    BatchFilter, BatchOrchestrator, BatchResult, BatchSummary, RunLock, SyncOutcome, SyncStatus,
    TestsStatus,
};

use crate::cli::Selection;
use crate::context::Context;
use crate::error::Result;

/// Run the sync command. Returns whether every batch succeeded.
pub async fn run_sync(ctx: &Context, selection: &Selection, json: bool) -> Result<bool> {
    ctx.check_account(selection.account.as_deref())?;
    let orchestrator = ctx.orchestrator()?;

    let _lock = RunLock::acquire(&ctx.workdir_root())?;
    let results = run_once(ctx, &orchestrator, selection).await;

    if json {
        let summaries: Vec<&BatchSummary> = results.iter().filter_map(BatchResult::summary).collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for summary in results.iter().filter_map(BatchResult::summary) {
            print_summary(summary);
        }
    }

    Ok(results.iter().all(BatchResult::success))
}

/// Run every account's batch in turn.
///
/// The caller holds the run lock.
pub async fn run_once(
    ctx: &Context,
    orchestrator: &BatchOrchestrator,
    selection: &Selection,
) -> Vec<BatchResult> {
    let filter = filter(selection);
    let mut results = Vec::with_capacity(ctx.accounts.len());
    for account in &ctx.accounts {
        results.push(orchestrator.run(account, &filter).await);
    }
    results
}

fn filter(selection: &Selection) -> BatchFilter {
    BatchFilter {
        account: selection.account.clone(),
        repository: selection.repo.clone(),
    }
}

pub fn print_summary(summary: &BatchSummary) {
    let verdict = if summary.success() {
        "ok".green().bold()
    } else {
        "failed".red().bold()
    };
    println!(
        "{} {} ({} synced, {} failed, {} skipped)",
        summary.account().bold(),
        verdict,
        summary.synced_repos(),
        summary.failed_repos(),
        summary.skipped_repos()
    );

    if summary.outcomes().is_empty() {
        println!("  {}", "No repositories selected".dimmed());
    }
    for outcome in summary.outcomes() {
        print_outcome(outcome);
    }
    println!();
}

fn print_outcome(outcome: &SyncOutcome) {
    let (marker, label) = match outcome.status() {
        SyncStatus::Synced => ("+".green(), "synced".green()),
        SyncStatus::Skipped => ("=".dimmed(), "up to date".dimmed()),
        SyncStatus::Error => ("!".red(), "error".red()),
    };

    let mut notes = Vec::new();
    if outcome.used_resolver() && outcome.success() {
        notes.push("conflicts resolved".to_string());
    }
    match outcome.tests_status() {
        TestsStatus::Passed => notes.push("tests passed".to_string()),
        TestsStatus::Failed => notes.push("tests failed".yellow().to_string()),
        TestsStatus::Error => notes.push("tests could not run".yellow().to_string()),
        TestsStatus::Absent => {}
    }
    if outcome.needs_attention() {
        notes.push("needs manual attention".red().bold().to_string());
    }

    let notes = if notes.is_empty() {
        String::new()
    } else {
        format!(" ({})", notes.join(", "))
    };
    println!("  {} {} {}{}", marker, outcome.repository().cyan(), label, notes);

    if let Some(error) = outcome.error() {
        println!("    {}", error.dimmed());
    }
}
