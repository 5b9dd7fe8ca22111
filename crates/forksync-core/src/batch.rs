//! Batch orchestration over one account's repository pairs
//!
//! Pairs are synchronized strictly one after another. A failure on one pair
//! becomes an error outcome for that pair and never stops its siblings.

use std::sync::Arc;

use crate::config::{Account, ReportConfig};
use crate::outcome::{BatchResult, BatchSummary, SyncOutcome};
use crate::report::Reporter;
use crate::sync::SyncEngine;

/// Optional selectors narrowing a batch.
#[derive(Debug, Clone, Default)]
pub struct BatchFilter {
    /// Only run if the account has exactly this name
    pub account: Option<String>,
    /// Only sync pairs whose upstream or fork identifier equals this
    pub repository: Option<String>,
}

impl BatchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(mut self, name: impl Into<String>) -> Self {
        self.account = Some(name.into());
        self
    }

    pub fn repository(mut self, selector: impl Into<String>) -> Self {
        self.repository = Some(selector.into());
        self
    }
}

/// Runs the sync engine over every pair of an account and reports the result.
pub struct BatchOrchestrator {
    engine: Arc<SyncEngine>,
    reporter: Option<Arc<dyn Reporter>>,
    report: ReportConfig,
}

impl BatchOrchestrator {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self {
            engine,
            reporter: None,
            report: ReportConfig::default(),
        }
    }

    /// Deliver summaries through `reporter` according to `config`.
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>, config: ReportConfig) -> Self {
        self.reporter = Some(reporter);
        self.report = config;
        self
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Synchronize every selected pair of `account`.
    pub async fn run(&self, account: &Account, filter: &BatchFilter) -> BatchResult {
        if let Some(selected) = &filter.account {
            if selected != &account.name {
                tracing::debug!(account = %account.name, filter = %selected, "Account not selected");
                return BatchResult::AccountFilterMismatch {
                    account: account.name.clone(),
                    filter: selected.clone(),
                };
            }
        }

        let pairs: Vec<_> = account
            .repos
            .iter()
            .filter(|pair| match &filter.repository {
                Some(selector) => pair.matches(selector),
                None => true,
            })
            .collect();

        if let (Some(selector), true) = (&filter.repository, pairs.is_empty()) {
            tracing::warn!(account = %account.name, selector = %selector, "No repository matched");
        }

        tracing::info!(account = %account.name, pairs = pairs.len(), "Starting batch");

        let mut summary = BatchSummary::new(&account.name);
        for pair in pairs {
            let outcome = match self.engine.sync(account, pair).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(
                        account = %account.name,
                        repository = %pair.fork.full_name(),
                        error = %e,
                        "Sync failed"
                    );
                    SyncOutcome::failed(&account.name, &pair.fork.full_name(), None, e.to_string())
                }
            };
            summary.record(outcome);
        }
        let summary = summary.finish();

        tracing::info!(
            account = %account.name,
            synced = summary.synced_repos(),
            failed = summary.failed_repos(),
            skipped = summary.skipped_repos(),
            success = summary.success(),
            "Batch finished"
        );

        self.deliver(&summary).await;
        BatchResult::Completed(summary)
    }

    /// Hand the summary to the reporter when there is something worth telling.
    async fn deliver(&self, summary: &BatchSummary) {
        let Some(reporter) = &self.reporter else {
            return;
        };
        if !should_report(&self.report, summary) {
            tracing::debug!(account = summary.account(), "Nothing to report");
            return;
        }
        if let Err(e) = reporter.report(&self.report, summary).await {
            tracing::error!(account = summary.account(), error = %e, "Failed to deliver report");
        }
    }
}

/// Reports go out when something was synced or failed, or when forced.
pub fn should_report(config: &ReportConfig, summary: &BatchSummary) -> bool {
    config.always || summary.synced_repos() > 0 || summary.failed_repos() > 0
}
