//! Per-repository outcomes and batch summaries

use chrono::{DateTime, Utc};
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

/// Terminal status of one repository pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Upstream changes merged and pushed
    Synced,
    /// No upstream drift, nothing merged
    Skipped,
    /// The pair could not be synchronized
    Error,
}

/// Result of the post-merge test gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestsStatus {
    Passed,
    Failed,
    /// The test command could not be run to completion
    Error,
    /// Tests disabled, or no merge happened
    Absent,
}

/// How a successful merge came about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    Clean,
    /// Conflicts were resolved by the conflict resolver
    Resolved,
}

/// Where a started merge failed before it could be published
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeFailure {
    /// The merge was clean but committing or pushing it failed
    Publish,
    /// Conflicts were reported but no conflicted file could be listed
    Discovery,
    /// The conflict resolver could not resolve every file
    Resolution,
    /// Conflicts were resolved but committing or pushing failed
    ResolvedPublish,
}

impl MergeFailure {
    pub fn had_conflicts(self) -> bool {
        !matches!(self, MergeFailure::Publish)
    }

    pub fn used_resolver(self) -> bool {
        matches!(
            self,
            MergeFailure::Resolution | MergeFailure::ResolvedPublish
        )
    }
}

/// Outcome of synchronizing one repository pair.
///
/// Only constructible through the associated functions below, which keep
/// `status` and the conflict flags consistent with each other. `success`
/// is derived from `status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    repository: String,
    account: String,
    status: SyncStatus,
    had_conflicts: bool,
    used_resolver: bool,
    tests_status: TestsStatus,
    message: Option<String>,
    error: Option<String>,
    /// The working copy may be left mid-merge and needs a human
    needs_attention: bool,
}

impl SyncOutcome {
    /// No upstream drift.
    pub fn skipped(account: &str, repository: &str, message: impl Into<String>) -> Self {
        Self {
            repository: repository.to_string(),
            account: account.to_string(),
            status: SyncStatus::Skipped,
            had_conflicts: false,
            used_resolver: false,
            tests_status: TestsStatus::Absent,
            message: Some(message.into()),
            error: None,
            needs_attention: false,
        }
    }

    /// Upstream merged and pushed.
    pub fn synced(
        account: &str,
        repository: &str,
        merge: MergeKind,
        tests_status: TestsStatus,
        message: impl Into<String>,
    ) -> Self {
        let resolved = merge == MergeKind::Resolved;
        Self {
            repository: repository.to_string(),
            account: account.to_string(),
            status: SyncStatus::Synced,
            had_conflicts: resolved,
            used_resolver: resolved,
            tests_status,
            message: Some(message.into()),
            error: None,
            needs_attention: false,
        }
    }

    /// Failure before any merge was started.
    pub fn failed(
        account: &str,
        repository: &str,
        message: Option<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            repository: repository.to_string(),
            account: account.to_string(),
            status: SyncStatus::Error,
            had_conflicts: false,
            used_resolver: false,
            tests_status: TestsStatus::Absent,
            message,
            error: Some(error.into()),
            needs_attention: false,
        }
    }

    /// A started merge failed at `failure` and was rolled back.
    ///
    /// `needs_attention` is set when the rollback itself failed.
    pub fn rolled_back(
        account: &str,
        repository: &str,
        failure: MergeFailure,
        message: impl Into<String>,
        error: impl Into<String>,
        needs_attention: bool,
    ) -> Self {
        Self {
            repository: repository.to_string(),
            account: account.to_string(),
            status: SyncStatus::Error,
            had_conflicts: failure.had_conflicts(),
            used_resolver: failure.used_resolver(),
            tests_status: TestsStatus::Absent,
            message: Some(message.into()),
            error: Some(error.into()),
            needs_attention,
        }
    }

    /// Fork full name (`owner/repo`)
    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn success(&self) -> bool {
        self.status != SyncStatus::Error
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    pub fn had_conflicts(&self) -> bool {
        self.had_conflicts
    }

    pub fn used_resolver(&self) -> bool {
        self.used_resolver
    }

    pub fn tests_status(&self) -> TestsStatus {
        self.tests_status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn needs_attention(&self) -> bool {
        self.needs_attention
    }
}

impl Serialize for SyncOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SyncOutcome", 10)?;
        state.serialize_field("repository", &self.repository)?;
        state.serialize_field("account", &self.account)?;
        state.serialize_field("success", &self.success())?;
        state.serialize_field("status", &self.status)?;
        state.serialize_field("hadConflicts", &self.had_conflicts)?;
        state.serialize_field("usedResolver", &self.used_resolver)?;
        state.serialize_field("testsStatus", &self.tests_status)?;
        match &self.message {
            Some(message) => state.serialize_field("message", message)?,
            None => state.skip_field("message")?,
        }
        match &self.error {
            Some(error) => state.serialize_field("error", error)?,
            None => state.skip_field("error")?,
        }
        state.serialize_field("needsAttention", &self.needs_attention)?;
        state.end()
    }
}

/// Aggregated results of one account's batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    account: String,
    success: bool,
    synced_repos: usize,
    failed_repos: usize,
    skipped_repos: usize,
    outcomes: Vec<SyncOutcome>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl BatchSummary {
    /// Start an empty, successful summary.
    pub fn new(account: &str) -> Self {
        Self {
            account: account.to_string(),
            success: true,
            synced_repos: 0,
            failed_repos: 0,
            skipped_repos: 0,
            outcomes: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Count an outcome and append it.
    pub fn record(&mut self, outcome: SyncOutcome) {
        match outcome.status() {
            SyncStatus::Synced => self.synced_repos += 1,
            SyncStatus::Skipped => self.skipped_repos += 1,
            SyncStatus::Error => {
                self.failed_repos += 1;
                self.success = false;
            }
        }
        self.outcomes.push(outcome);
    }

    /// Stamp the completion time, closing the summary.
    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn synced_repos(&self) -> usize {
        self.synced_repos
    }

    pub fn failed_repos(&self) -> usize {
        self.failed_repos
    }

    pub fn skipped_repos(&self) -> usize {
        self.skipped_repos
    }

    pub fn outcomes(&self) -> &[SyncOutcome] {
        &self.outcomes
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }
}

/// Result of running one account's batch.
#[derive(Debug, Clone)]
pub enum BatchResult {
    Completed(BatchSummary),
    /// An account selector was given and did not name this account;
    /// no repository was touched
    AccountFilterMismatch { account: String, filter: String },
}

impl BatchResult {
    /// Whether the batch should count as a failure for the caller.
    ///
    /// A filter mismatch is not a failure.
    pub fn success(&self) -> bool {
        match self {
            BatchResult::Completed(summary) => summary.success(),
            BatchResult::AccountFilterMismatch { .. } => true,
        }
    }

    pub fn summary(&self) -> Option<&BatchSummary> {
        match self {
            BatchResult::Completed(summary) => Some(summary),
            BatchResult::AccountFilterMismatch { .. } => None,
        }
    }
}
