//! Report rendering

use std::fmt::Write;

use crate::Result;
use crate::outcome::{BatchSummary, SyncOutcome, SyncStatus, TestsStatus};

/// One-line summary, used as the email subject.
pub fn subject_line(summary: &BatchSummary) -> String {
    format!(
        "[forksync] {}: {} synced, {} failed, {} skipped",
        summary.account(),
        summary.synced_repos(),
        summary.failed_repos(),
        summary.skipped_repos()
    )
}

fn status_label(outcome: &SyncOutcome) -> &'static str {
    match outcome.status() {
        SyncStatus::Synced => "synced",
        SyncStatus::Skipped => "skipped",
        SyncStatus::Error => "error",
    }
}

fn tests_label(status: TestsStatus) -> &'static str {
    match status {
        TestsStatus::Passed => "passed",
        TestsStatus::Failed => "failed",
        TestsStatus::Error => "error",
        TestsStatus::Absent => "-",
    }
}

/// Render a summary as Markdown.
pub fn render_markdown(summary: &BatchSummary) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# forksync report: {}", summary.account());
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Started {}",
        summary.started_at().format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(finished) = summary.finished_at() {
        let _ = writeln!(out, "Finished {}", finished.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "**{}**: {} synced, {} failed, {} skipped",
        if summary.success() { "OK" } else { "FAILED" },
        summary.synced_repos(),
        summary.failed_repos(),
        summary.skipped_repos()
    );

    if summary.outcomes().is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "No repositories matched.");
        return out;
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "| Repository | Status | Conflicts | Tests | Details |");
    let _ = writeln!(out, "|---|---|---|---|---|");
    for outcome in summary.outcomes() {
        let conflicts = match (outcome.had_conflicts(), outcome.used_resolver()) {
            (true, true) => "resolver",
            (true, false) => "yes",
            _ => "-",
        };
        let details = outcome
            .error()
            .or(outcome.message())
            .unwrap_or("")
            .replace('|', "\\|")
            .replace('\n', " ");
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} |",
            outcome.repository(),
            status_label(outcome),
            conflicts,
            tests_label(outcome.tests_status()),
            details
        );
    }

    let attention: Vec<&SyncOutcome> = summary
        .outcomes()
        .iter()
        .filter(|o| o.needs_attention())
        .collect();
    if !attention.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Manual intervention required");
        let _ = writeln!(out);
        for outcome in attention {
            let _ = writeln!(
                out,
                "- {}: {}",
                outcome.repository(),
                outcome.error().unwrap_or("rollback failed")
            );
        }
    }

    out
}

/// Render a summary as pretty-printed JSON.
pub fn render_json(summary: &BatchSummary) -> Result<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}
