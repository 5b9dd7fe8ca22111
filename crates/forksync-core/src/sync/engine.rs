//! SyncEngine implementation
//!
//! Drives one repository pair through the synchronization state machine:
//!
//! ```text
//! Init -> CheckDrift -> NoChange
//!                    -> Merging -> Merged
//!                               -> ConflictDetected -> Resolved -> Merged
//!                                                   -> Unresolved -> RolledBack
//! ```
//!
//! A merge whose publication fails is rolled back the same way as an
//! unresolved conflict.
//!
//! Any unexpected failure ends the pair in an error state. The engine never
//! retries; bounding individual calls is left to the collaborators.

use std::path::PathBuf;
use std::sync::Arc;

use forksync_git::{RepoClient, RepoClientFactory};
use tracing::Instrument;

use crate::config::{Account, ModelConfig};
use crate::identifier::RepoPair;
use crate::logger::RepoLogger;
use crate::outcome::{MergeFailure, MergeKind, SyncOutcome, TestsStatus};
use crate::resolver::{ConflictResolver, Resolution};
use crate::test_runner::TestRunner;
use crate::workdir::working_copy_dir;
use crate::{Error, Result};

/// Message recorded when the working copy could not be prepared
pub const INIT_FAILED_MESSAGE: &str = "Failed to initialize repository";

/// Name of the remote pointing at the upstream repository
pub const UPSTREAM_REMOTE: &str = "upstream";

/// Name of the remote pointing at the fork
pub const ORIGIN_REMOTE: &str = "origin";

/// Settings the engine needs beyond its collaborators
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Parent directory of all working copies
    pub workdir_root: PathBuf,
    /// Host used to build clone URLs
    pub git_host: String,
    /// Model configuration handed to the conflict resolver
    pub model: ModelConfig,
    /// Run the test gate after a successful merge
    pub run_tests: bool,
}

/// Commit message for merges completed by the conflict resolver.
pub fn resolution_commit_message(pair: &RepoPair) -> String {
    format!(
        "Merge {} with automated conflict resolution",
        pair.upstream_ref()
    )
}

/// Engine that synchronizes one repository pair at a time.
pub struct SyncEngine {
    clients: Arc<dyn RepoClientFactory>,
    resolver: Arc<dyn ConflictResolver>,
    test_runner: Arc<dyn TestRunner>,
    options: EngineOptions,
}

impl SyncEngine {
    pub fn new(
        clients: Arc<dyn RepoClientFactory>,
        resolver: Arc<dyn ConflictResolver>,
        test_runner: Arc<dyn TestRunner>,
        options: EngineOptions,
    ) -> Self {
        Self {
            clients,
            resolver,
            test_runner,
            options,
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Open the repository client for a pair's working copy.
    pub(crate) fn open(&self, account: &Account, pair: &RepoPair) -> Arc<dyn RepoClient> {
        let workdir = working_copy_dir(&self.options.workdir_root, &account.name, &pair.fork);
        self.clients.open(&workdir)
    }

    /// Synchronize one repository pair.
    ///
    /// Initialization failures and every failure after a merge has started
    /// come back as error outcomes, the latter after rolling the merge back.
    /// Drift-check and non-conflict merge failures are returned as `Err` for
    /// the caller to convert.
    pub async fn sync(&self, account: &Account, pair: &RepoPair) -> Result<SyncOutcome> {
        let logger = RepoLogger::new(&account.name, &pair.fork.full_name());
        let span = logger.span().clone();
        self.run_pair(account, pair, &logger).instrument(span).await
    }

    async fn run_pair(
        &self,
        account: &Account,
        pair: &RepoPair,
        logger: &RepoLogger,
    ) -> Result<SyncOutcome> {
        let repo = self.open(account, pair);
        let repository = pair.fork.full_name();

        logger.info(format_args!("Syncing {} into {}", pair.upstream, pair.fork));

        // Init
        if let Err(e) = self.initialize(repo.as_ref(), account, pair, logger).await {
            let error = Error::Initialization { source: e };
            logger.error(&error);
            return Ok(SyncOutcome::failed(
                &account.name,
                &repository,
                Some(INIT_FAILED_MESSAGE.to_string()),
                error.to_string(),
            ));
        }

        // CheckDrift
        let new_commits = self
            .detect_drift(repo.as_ref(), pair)
            .await
            .map_err(|source| Error::DriftCheck { source })?;

        if new_commits.is_empty() {
            logger.info("No new upstream commits");
            return Ok(SyncOutcome::skipped(
                &account.name,
                &repository,
                "Already up to date with upstream",
            ));
        }

        logger.info(format_args!(
            "{} new upstream commit(s) to merge",
            new_commits.len()
        ));
        for commit in &new_commits {
            logger.debug(commit);
        }

        // Merging
        let anchor = repo.head_revision().await?;
        let reference = pair.upstream_ref();

        let attempt = match repo.merge(&reference).await {
            Ok(()) => {
                logger.info(format_args!("Merged {reference} cleanly"));
                self.publish(repo.as_ref(), pair, None, logger)
                    .await
                    .map(|()| MergeKind::Clean)
                    .map_err(|source| Abandon {
                        failure: MergeFailure::Publish,
                        error: Error::Publish { source },
                    })
            }
            Err(e) if e.is_merge_conflict() => {
                logger.warn(format_args!("Merge of {reference} produced conflicts"));
                self.handle_conflicts(repo.as_ref(), pair, logger)
                    .await
                    .map(|()| MergeKind::Resolved)
            }
            Err(source) => {
                return Err(Error::CleanMergeFailure { reference, source });
            }
        };

        let merge = match attempt {
            Ok(merge) => merge,
            Err(abandon) => {
                return Ok(self
                    .abandon(repo.as_ref(), account, pair, &anchor, abandon, logger)
                    .await);
            }
        };

        // Merged
        let tests_status = self.test_gate(repo.as_ref(), logger).await;

        let message = match merge {
            MergeKind::Clean => format!("Merged {} upstream commit(s)", new_commits.len()),
            MergeKind::Resolved => format!(
                "Merged {} upstream commit(s) with automated conflict resolution",
                new_commits.len()
            ),
        };
        logger.info(&message);

        Ok(SyncOutcome::synced(
            &account.name,
            &repository,
            merge,
            tests_status,
            message,
        ))
    }

    /// Prepare the working copy: clone or refresh, wire remotes, fetch, and
    /// check out the fork branch at its published state.
    async fn initialize(
        &self,
        repo: &dyn RepoClient,
        account: &Account,
        pair: &RepoPair,
        logger: &RepoLogger,
    ) -> forksync_git::Result<()> {
        let host = &self.options.git_host;
        let fork_url = pair.fork.authenticated_url(host, &account.token);
        let upstream_url = pair.upstream.public_url(host);

        if repo.exists().await? {
            // Tokens rotate, so the stored URL may be stale
            logger.debug("Working copy exists, refreshing origin URL");
            repo.set_remote_url(ORIGIN_REMOTE, &fork_url).await?;
        } else {
            logger.info(format_args!(
                "Cloning {} into {}",
                pair.fork.full_name(),
                repo.workdir().display()
            ));
            repo.clone_from(&fork_url).await?;
        }

        self.ensure_upstream_remote(repo, &upstream_url, logger)
            .await?;

        repo.fetch(&["--all"]).await?;
        repo.checkout(&pair.fork.branch).await?;

        let tracking = format!("{}/{}", ORIGIN_REMOTE, pair.fork.branch);
        match repo.set_tracking_branch(&tracking).await {
            Ok(()) => {
                // Discard anything a previous run left unpublished
                repo.hard_reset(&tracking).await?;
            }
            Err(e) => {
                logger.warn(format_args!(
                    "Could not track {tracking} (remote branch may not exist yet): {e}"
                ));
            }
        }

        Ok(())
    }

    /// Add the `upstream` remote, or correct its URL if it has drifted.
    ///
    /// A failed URL correction is logged and tolerated; a failure to add the
    /// remote is not.
    pub(super) async fn ensure_upstream_remote(
        &self,
        repo: &dyn RepoClient,
        url: &str,
        logger: &RepoLogger,
    ) -> forksync_git::Result<()> {
        let remotes = repo.list_remotes().await?;

        match remotes.iter().find(|r| r.name == UPSTREAM_REMOTE) {
            None => {
                logger.debug(format_args!("Adding upstream remote {url}"));
                repo.add_remote(UPSTREAM_REMOTE, url).await?;
            }
            Some(existing) if existing.url != url => {
                logger.info(format_args!(
                    "Updating upstream remote from {} to {}",
                    existing.url, url
                ));
                if let Err(e) = repo.set_remote_url(UPSTREAM_REMOTE, url).await {
                    logger.warn(format_args!("Failed to update upstream remote URL: {e}"));
                }
            }
            Some(_) => {}
        }

        Ok(())
    }

    /// Commits on the upstream branch not yet reachable from the fork branch.
    async fn detect_drift(
        &self,
        repo: &dyn RepoClient,
        pair: &RepoPair,
    ) -> forksync_git::Result<Vec<String>> {
        repo.checkout(&pair.fork.branch).await?;
        self.pending_commits(repo, pair).await
    }

    /// Fetch the upstream remote and list commits missing from the fork
    /// branch. Leaves the checked-out branch and work tree alone.
    pub(super) async fn pending_commits(
        &self,
        repo: &dyn RepoClient,
        pair: &RepoPair,
    ) -> forksync_git::Result<Vec<String>> {
        repo.fetch(&[UPSTREAM_REMOTE]).await?;

        let range = format!("{}..{}", pair.fork.branch, pair.upstream_ref());
        let listing = repo.list_new_commits(&range).await?;

        Ok(listing
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }

    /// Push the merged fork branch, committing the staged resolution first
    /// when `commit_message` is given.
    async fn publish(
        &self,
        repo: &dyn RepoClient,
        pair: &RepoPair,
        commit_message: Option<&str>,
        logger: &RepoLogger,
    ) -> forksync_git::Result<()> {
        if let Some(message) = commit_message {
            repo.commit(message).await?;
        }
        repo.push(ORIGIN_REMOTE, &pair.fork.branch).await?;

        logger.info(format_args!(
            "Pushed {} to {}",
            pair.fork.branch, ORIGIN_REMOTE
        ));
        Ok(())
    }

    /// ConflictDetected: discover conflicted files, delegate to the resolver,
    /// and publish the resolution.
    async fn handle_conflicts(
        &self,
        repo: &dyn RepoClient,
        pair: &RepoPair,
        logger: &RepoLogger,
    ) -> std::result::Result<(), Abandon> {
        let conflicted = match repo.status().await {
            Ok(status) => status.conflicted,
            Err(e) => {
                logger.warn(format_args!("Status query failed: {e}"));
                Vec::new()
            }
        };

        if conflicted.is_empty() {
            return Err(Abandon {
                failure: MergeFailure::Discovery,
                error: Error::ConflictDiscovery,
            });
        }

        logger.info(format_args!(
            "Resolving {} conflicted file(s): {}",
            conflicted.len(),
            conflicted.join(", ")
        ));

        let resolution = self
            .resolver
            .resolve(repo, &conflicted, &self.options.model, logger)
            .await;

        match resolution {
            Resolution::Resolved => {
                logger.info("Conflict resolver staged all files");
                let message = resolution_commit_message(pair);
                self.publish(repo, pair, Some(&message), logger)
                    .await
                    .map_err(|source| Abandon {
                        failure: MergeFailure::ResolvedPublish,
                        error: Error::Publish { source },
                    })
            }
            Resolution::Failed { reason } => Err(Abandon {
                failure: MergeFailure::Resolution,
                error: Error::ConflictResolution { reason },
            }),
        }
    }

    /// Roll back a merge that cannot be completed and describe the result.
    ///
    /// A failed rollback is carried into the outcome as `needs_attention`
    /// together with both errors.
    async fn abandon(
        &self,
        repo: &dyn RepoClient,
        account: &Account,
        pair: &RepoPair,
        anchor: &str,
        abandon: Abandon,
        logger: &RepoLogger,
    ) -> SyncOutcome {
        let Abandon { failure, error } = abandon;
        logger.error(&error);

        let (error, needs_attention) = match self.rollback(repo, anchor, logger).await {
            Ok(()) => (error.to_string(), false),
            Err(rollback) => {
                logger.error(&rollback);
                (format!("{error}; {rollback}"), true)
            }
        };

        let stage = match failure {
            MergeFailure::Publish => "Failed to publish merge",
            MergeFailure::Discovery => "Failed to identify conflicted files",
            MergeFailure::Resolution => "Conflict resolution failed",
            MergeFailure::ResolvedPublish => "Failed to publish resolved merge",
        };
        let message = if needs_attention {
            format!("{stage}; rollback failed, manual intervention required")
        } else {
            format!("{stage}; merge rolled back")
        };

        SyncOutcome::rolled_back(
            &account.name,
            &pair.fork.full_name(),
            failure,
            message,
            error,
            needs_attention,
        )
    }

    /// Undo an in-progress merge: `merge --abort`, falling back to a hard
    /// reset to `anchor`.
    async fn rollback(
        &self,
        repo: &dyn RepoClient,
        anchor: &str,
        logger: &RepoLogger,
    ) -> Result<()> {
        let abort = match repo.abort_merge().await {
            Ok(()) => {
                logger.info("Merge aborted");
                return Ok(());
            }
            Err(e) => e,
        };

        logger.warn(format_args!(
            "merge --abort failed ({abort}), resetting to {anchor}"
        ));

        match repo.hard_reset(anchor).await {
            Ok(()) => {
                logger.info(format_args!("Reset to {anchor}"));
                Ok(())
            }
            Err(reset) => Err(Error::RollbackFailure {
                path: repo.workdir().to_path_buf(),
                anchor: anchor.to_string(),
                abort: abort.to_string(),
                reset: reset.to_string(),
            }),
        }
    }

    /// Post-merge test gate. Annotates only; never fails the pair.
    async fn test_gate(&self, repo: &dyn RepoClient, logger: &RepoLogger) -> TestsStatus {
        if !self.options.run_tests {
            return TestsStatus::Absent;
        }

        match self.test_runner.run(repo.workdir()).await {
            Ok(true) => TestsStatus::Passed,
            Ok(false) => {
                logger.warn("Tests failed after merge");
                TestsStatus::Failed
            }
            Err(e) => {
                logger.warn(format_args!("Tests could not be run: {e}"));
                TestsStatus::Error
            }
        }
    }
}

/// A started merge that has to be rolled back
struct Abandon {
    failure: MergeFailure,
    error: Error,
}
