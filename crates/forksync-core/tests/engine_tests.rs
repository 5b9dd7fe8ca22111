//! Tests for the per-pair sync state machine

mod common;

use std::sync::Arc;

use common::*;
use forksync_core::sync::INIT_FAILED_MESSAGE;
use forksync_core::{Error, SyncStatus, TestsStatus};
use pretty_assertions::assert_eq;

struct Harness {
    factory: Arc<FakeRepoFactory>,
    resolver: Arc<FakeResolver>,
    runner: Arc<FakeTestRunner>,
}

impl Harness {
    fn new() -> Self {
        Self::with(FakeResolver::resolving(), TestResult::Pass)
    }

    fn with(resolver: FakeResolver, tests: TestResult) -> Self {
        Self {
            factory: Arc::new(FakeRepoFactory::new()),
            resolver: Arc::new(resolver),
            runner: Arc::new(FakeTestRunner::new(tests)),
        }
    }

    fn engine(&self, run_tests: bool) -> forksync_core::SyncEngine {
        engine(
            Arc::clone(&self.factory),
            Arc::clone(&self.resolver),
            Arc::clone(&self.runner),
            run_tests,
        )
    }
}

fn widgets() -> forksync_core::RepoPair {
    pair("acme/widgets:main", "me/widgets:main")
}

mod init {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_fresh_working_copy_is_cloned_with_token() {
        let h = Harness::new();
        let p = widgets();
        let repo = h.factory.insert("acct", &p, FakeRepo::new());

        let outcome = h
            .engine(false)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert_eq!(outcome.status(), SyncStatus::Skipped);
        assert!(repo.called("clone_from https://tok@github.com/me/widgets.git"));
        assert!(repo.called("add_remote upstream https://github.com/acme/widgets.git"));
        assert!(repo.called("fetch --all"));
        assert!(repo.called("checkout main"));
        assert!(repo.called("set_tracking_branch origin/main"));
        assert!(repo.called("hard_reset origin/main"));
    }

    #[tokio::test]
    async fn test_existing_working_copy_refreshes_origin() {
        let h = Harness::new();
        let p = widgets();
        let repo = h.factory.insert("acct", &p, FakeRepo::new().existing(&p));

        h.engine(false)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(!repo.called_prefix("clone_from"));
        assert!(repo.called("set_remote_url origin https://tok@github.com/me/widgets.git"));
        assert!(!repo.called_prefix("add_remote"));
    }

    #[tokio::test]
    async fn test_stale_upstream_url_is_corrected() {
        let h = Harness::new();
        let p = widgets();
        let repo = h.factory.insert(
            "acct",
            &p,
            FakeRepo::new()
                .existing(&p)
                .with_remote("upstream", "https://github.com/old/widgets.git"),
        );

        h.engine(false)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(repo.called("set_remote_url upstream https://github.com/acme/widgets.git"));
    }

    #[tokio::test]
    async fn test_upstream_url_correction_failure_is_tolerated() {
        let h = Harness::new();
        let p = widgets();
        h.factory.insert(
            "acct",
            &p,
            FakeRepo::new()
                .existing(&p)
                .with_remote("upstream", "https://github.com/old/widgets.git")
                .failing("set_remote_url upstream"),
        );

        let outcome = h
            .engine(false)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();
        assert!(outcome.success());
    }

    #[tokio::test]
    async fn test_tracking_failure_is_tolerated() {
        let h = Harness::new();
        let p = widgets();
        let repo = h.factory.insert(
            "acct",
            &p,
            FakeRepo::new().failing("set_tracking_branch"),
        );

        let outcome = h
            .engine(false)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(outcome.success());
        assert!(!repo.called("hard_reset origin/main"));
    }

    #[tokio::test]
    async fn test_clone_failure_is_error_outcome() {
        let h = Harness::new();
        let p = widgets();
        let repo = h
            .factory
            .insert("acct", &p, FakeRepo::new().failing("clone_from"));

        let outcome = h
            .engine(false)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(!outcome.success());
        assert_eq!(outcome.status(), SyncStatus::Error);
        assert_eq!(outcome.message(), Some(INIT_FAILED_MESSAGE));
        assert!(!repo.called_prefix("merge"));
    }

    #[tokio::test]
    async fn test_fetch_failure_during_init_is_error_outcome() {
        let h = Harness::new();
        let p = widgets();
        h.factory
            .insert("acct", &p, FakeRepo::new().failing("fetch --all"));

        let outcome = h
            .engine(false)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(!outcome.success());
        assert!(outcome.error().unwrap().contains("Failed to initialize repository"));
    }
}

mod drift {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_no_drift_is_skipped_without_merge_or_push() {
        let h = Harness::new();
        let p = widgets();
        let repo = h.factory.insert("acct", &p, FakeRepo::new().existing(&p));

        let outcome = h
            .engine(true)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(outcome.success());
        assert_eq!(outcome.status(), SyncStatus::Skipped);
        assert_eq!(outcome.tests_status(), TestsStatus::Absent);
        assert!(repo.called("list_new_commits main..upstream/main"));
        assert!(!repo.called_prefix("merge"));
        assert!(!repo.called_prefix("push"));
        assert_eq!(h.runner.runs(), 0);
    }

    #[tokio::test]
    async fn test_range_uses_both_branches() {
        let h = Harness::new();
        let p = pair("acme/widgets:develop", "me/widgets:sync");
        let repo = h.factory.insert("acct", &p, FakeRepo::new().existing(&p));

        h.engine(false)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(repo.called("fetch upstream"));
        assert!(repo.called("list_new_commits sync..upstream/develop"));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_drift_error() {
        let h = Harness::new();
        let p = widgets();
        h.factory.insert(
            "acct",
            &p,
            FakeRepo::new().existing(&p).failing("fetch upstream"),
        );

        let err = h
            .engine(false)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DriftCheck { .. }));
    }
}

mod merge {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_clean_merge_pushes_once() {
        let h = Harness::new();
        let p = widgets();
        let repo = h.factory.insert(
            "acct",
            &p,
            FakeRepo::new()
                .existing(&p)
                .with_new_commits(&["1a2b3c4 Fix parser", "5d6e7f8 Add docs"]),
        );

        let outcome = h
            .engine(false)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(outcome.success());
        assert_eq!(outcome.status(), SyncStatus::Synced);
        assert!(!outcome.had_conflicts());
        assert!(!outcome.used_resolver());
        assert_eq!(outcome.message(), Some("Merged 2 upstream commit(s)"));
        assert_eq!(repo.count("push origin main"), 1);
        assert!(repo.called("merge upstream/main"));
        assert!(!repo.called_prefix("commit"));
        assert!(h.resolver.seen().is_empty());
    }

    #[tokio::test]
    async fn test_non_conflict_merge_failure_is_error() {
        let h = Harness::new();
        let p = widgets();
        let repo = h.factory.insert(
            "acct",
            &p,
            FakeRepo::new()
                .existing(&p)
                .with_new_commits(&["1a2b3c4 Fix"])
                .merge(MergeBehavior::Fail),
        );

        let err = h
            .engine(false)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::CleanMergeFailure { .. }));
        assert!(!repo.called_prefix("push"));
        assert!(h.resolver.seen().is_empty());
    }

    #[tokio::test]
    async fn test_push_failure_rolls_back_and_errors() {
        let h = Harness::new();
        let p = widgets();
        let repo = h.factory.insert(
            "acct",
            &p,
            FakeRepo::new()
                .existing(&p)
                .with_new_commits(&["1a2b3c4 Fix"])
                .failing("push"),
        );

        let outcome = h
            .engine(true)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(!outcome.success());
        assert_eq!(outcome.status(), SyncStatus::Error);
        assert!(!outcome.had_conflicts());
        assert!(!outcome.used_resolver());
        assert!(!outcome.needs_attention());
        assert_eq!(outcome.tests_status(), TestsStatus::Absent);
        assert!(outcome.error().unwrap().starts_with("Failed to publish merge"));
        assert_eq!(
            outcome.message(),
            Some("Failed to publish merge; merge rolled back")
        );

        let push = repo.position("push origin main").unwrap();
        let abort = repo.position("abort_merge").unwrap();
        assert!(push < abort);
        assert_eq!(h.runner.runs(), 0);
    }

    #[tokio::test]
    async fn test_push_failure_with_failed_rollback_needs_attention() {
        let h = Harness::new();
        let p = widgets();
        let repo = h.factory.insert(
            "acct",
            &p,
            FakeRepo::new()
                .existing(&p)
                .with_new_commits(&["1a2b3c4 Fix"])
                .failing("push")
                .failing("abort_merge")
                .failing(&format!("hard_reset {ANCHOR}")),
        );

        let outcome = h
            .engine(false)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(!outcome.success());
        assert!(outcome.needs_attention());
        let error = outcome.error().unwrap();
        assert!(error.contains("Failed to publish merge"), "{error}");
        assert!(error.contains("manual intervention required"), "{error}");
        assert!(outcome.message().unwrap().contains("rollback failed"));
        assert!(repo.called(&format!("hard_reset {ANCHOR}")));
    }
}

mod conflicts {
    use super::*;
    use pretty_assertions::assert_eq;

    fn conflicting(p: &forksync_core::RepoPair) -> FakeRepo {
        FakeRepo::new()
            .existing(p)
            .with_new_commits(&["1a2b3c4 Rewrite lib"])
            .merge(MergeBehavior::Conflict)
            .conflicted(&["src/lib.rs", "README.md"])
    }

    #[tokio::test]
    async fn test_resolved_conflicts_commit_before_push() {
        let h = Harness::new();
        let p = widgets();
        let repo = h.factory.insert("acct", &p, conflicting(&p));

        let outcome = h
            .engine(false)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(outcome.success());
        assert_eq!(outcome.status(), SyncStatus::Synced);
        assert!(outcome.had_conflicts());
        assert!(outcome.used_resolver());

        assert_eq!(
            h.resolver.seen(),
            vec![vec!["src/lib.rs".to_string(), "README.md".to_string()]]
        );

        let commit = repo
            .position("commit Merge upstream/main with automated conflict resolution")
            .expect("resolution commit");
        let push = repo.position("push origin main").expect("push");
        assert!(commit < push);
        assert!(repo.called("stage_files src/lib.rs README.md"));
        assert!(!repo.called("abort_merge"));
    }

    #[tokio::test]
    async fn test_resolver_failure_aborts_merge() {
        let h = Harness::with(FakeResolver::failing("model returned markers"), TestResult::Pass);
        let p = widgets();
        let repo = h.factory.insert("acct", &p, conflicting(&p));

        let outcome = h
            .engine(false)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(!outcome.success());
        assert_eq!(outcome.status(), SyncStatus::Error);
        assert!(outcome.had_conflicts());
        assert!(outcome.error().unwrap().contains("model returned markers"));
        assert!(!outcome.needs_attention());

        assert!(repo.called("abort_merge"));
        assert!(!repo.called(&format!("hard_reset {ANCHOR}")));
        assert!(!repo.called_prefix("commit"));
        assert!(!repo.called_prefix("push"));
    }

    #[tokio::test]
    async fn test_failed_abort_falls_back_to_reset() {
        let h = Harness::with(FakeResolver::failing("timeout"), TestResult::Pass);
        let p = widgets();
        let repo = h
            .factory
            .insert("acct", &p, conflicting(&p).failing("abort_merge"));

        let outcome = h
            .engine(false)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(!outcome.success());
        assert!(!outcome.needs_attention());

        let abort = repo.position("abort_merge").unwrap();
        let reset = repo.position(&format!("hard_reset {ANCHOR}")).unwrap();
        assert!(abort < reset);
    }

    #[tokio::test]
    async fn test_failed_rollback_needs_attention() {
        let h = Harness::with(FakeResolver::failing("timeout"), TestResult::Pass);
        let p = widgets();
        h.factory.insert(
            "acct",
            &p,
            conflicting(&p)
                .failing("abort_merge")
                .failing(&format!("hard_reset {ANCHOR}")),
        );

        let outcome = h
            .engine(false)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(!outcome.success());
        assert!(outcome.needs_attention());
        let error = outcome.error().unwrap();
        assert!(error.contains("timeout"));
        assert!(error.contains("manual intervention required"));
    }

    fn undiscoverable(p: &forksync_core::RepoPair) -> FakeRepo {
        FakeRepo::new()
            .existing(p)
            .with_new_commits(&["1a2b3c4 Rewrite"])
            .merge(MergeBehavior::Conflict)
    }

    #[tokio::test]
    async fn test_empty_conflict_list_is_discovery_error() {
        let h = Harness::new();
        let p = widgets();
        let repo = h.factory.insert("acct", &p, undiscoverable(&p));

        let outcome = h
            .engine(false)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(!outcome.success());
        assert_eq!(outcome.status(), SyncStatus::Error);
        assert!(outcome.had_conflicts());
        assert!(!outcome.used_resolver());
        assert_eq!(
            outcome.error(),
            Some("Failed to identify conflicted files for resolution")
        );
        assert!(repo.called("abort_merge"));
        assert!(h.resolver.seen().is_empty());
    }

    #[tokio::test]
    async fn test_status_failure_is_discovery_error() {
        let h = Harness::new();
        let p = widgets();
        h.factory
            .insert("acct", &p, conflicting(&p).failing("status"));

        let outcome = h
            .engine(false)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(outcome.had_conflicts());
        assert_eq!(
            outcome.error(),
            Some(Error::ConflictDiscovery.to_string().as_str())
        );
        assert!(h.resolver.seen().is_empty());
    }

    #[tokio::test]
    async fn test_discovery_failure_falls_back_to_reset() {
        let h = Harness::new();
        let p = widgets();
        let repo = h
            .factory
            .insert("acct", &p, undiscoverable(&p).failing("abort_merge"));

        let outcome = h
            .engine(false)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(!outcome.needs_attention());
        let calls = repo.calls();
        let tail: Vec<&str> = calls.iter().rev().take(4).rev().map(String::as_str).collect();
        assert_eq!(
            tail,
            vec![
                "merge upstream/main",
                "status",
                "abort_merge",
                "hard_reset anchor0000"
            ]
        );
    }

    #[tokio::test]
    async fn test_discovery_failure_with_failed_rollback_needs_attention() {
        let h = Harness::new();
        let p = widgets();
        h.factory.insert(
            "acct",
            &p,
            undiscoverable(&p)
                .failing("abort_merge")
                .failing(&format!("hard_reset {ANCHOR}")),
        );

        let outcome = h
            .engine(false)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(outcome.needs_attention());
        assert!(outcome.had_conflicts());
        assert!(outcome.error().unwrap().contains("manual intervention required"));
    }

    #[tokio::test]
    async fn test_push_failure_after_resolution_keeps_conflict_flags() {
        let h = Harness::new();
        let p = widgets();
        let repo = h
            .factory
            .insert("acct", &p, conflicting(&p).failing("push"));

        let outcome = h
            .engine(false)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(!outcome.success());
        assert!(outcome.had_conflicts());
        assert!(outcome.used_resolver());
        assert!(!outcome.needs_attention());
        assert_eq!(
            outcome.message(),
            Some("Failed to publish resolved merge; merge rolled back")
        );

        let commit = repo
            .position("commit Merge upstream/main with automated conflict resolution")
            .unwrap();
        let push = repo.position("push origin main").unwrap();
        let abort = repo.position("abort_merge").unwrap();
        assert!(commit < push && push < abort);
    }

    #[tokio::test]
    async fn test_commit_failure_after_resolution_rolls_back() {
        let h = Harness::new();
        let p = widgets();
        let repo = h
            .factory
            .insert("acct", &p, conflicting(&p).failing("commit"));

        let outcome = h
            .engine(false)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(!outcome.success());
        assert!(outcome.used_resolver());
        assert!(repo.called("abort_merge"));
        assert!(!repo.called_prefix("push"));
    }

    #[tokio::test]
    async fn test_push_failure_after_resolution_with_failed_rollback() {
        let h = Harness::new();
        let p = widgets();
        let repo = h.factory.insert(
            "acct",
            &p,
            conflicting(&p)
                .failing("push")
                .failing("abort_merge")
                .failing(&format!("hard_reset {ANCHOR}")),
        );

        let outcome = h
            .engine(false)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(outcome.needs_attention());
        assert!(outcome.had_conflicts());
        assert!(outcome.used_resolver());
        let error = outcome.error().unwrap();
        assert!(error.contains("Failed to publish merge"), "{error}");
        assert!(error.contains("manual intervention required"), "{error}");

        let abort = repo.position("abort_merge").unwrap();
        let reset = repo.position(&format!("hard_reset {ANCHOR}")).unwrap();
        assert!(abort < reset);
    }
}

mod test_gate {
    use super::*;
    use pretty_assertions::assert_eq;

    fn drifting(p: &forksync_core::RepoPair) -> FakeRepo {
        FakeRepo::new().existing(p).with_new_commits(&["1a2b3c4 Fix"])
    }

    #[tokio::test]
    async fn test_disabled_gate_is_absent() {
        let h = Harness::new();
        let p = widgets();
        h.factory.insert("acct", &p, drifting(&p));

        let outcome = h
            .engine(false)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert_eq!(outcome.tests_status(), TestsStatus::Absent);
        assert_eq!(h.runner.runs(), 0);
    }

    #[tokio::test]
    async fn test_passing_tests() {
        let h = Harness::new();
        let p = widgets();
        h.factory.insert("acct", &p, drifting(&p));

        let outcome = h
            .engine(true)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert_eq!(outcome.tests_status(), TestsStatus::Passed);
        assert_eq!(h.runner.runs(), 1);
    }

    #[tokio::test]
    async fn test_failing_tests_only_annotate() {
        let h = Harness::with(FakeResolver::resolving(), TestResult::Fail);
        let p = widgets();
        h.factory.insert("acct", &p, drifting(&p));

        let outcome = h
            .engine(true)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(outcome.success());
        assert_eq!(outcome.status(), SyncStatus::Synced);
        assert_eq!(outcome.tests_status(), TestsStatus::Failed);
    }

    #[tokio::test]
    async fn test_runner_error_only_annotates() {
        let h = Harness::with(FakeResolver::resolving(), TestResult::Error);
        let p = widgets();
        h.factory.insert("acct", &p, drifting(&p));

        let outcome = h
            .engine(true)
            .sync(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(outcome.success());
        assert_eq!(outcome.tests_status(), TestsStatus::Error);
    }
}

mod preview {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_preview_without_working_copy_does_not_clone() {
        let h = Harness::new();
        let p = widgets();
        let repo = h.factory.insert("acct", &p, FakeRepo::new());

        let preview = h
            .engine(false)
            .preview(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(!preview.present);
        assert!(preview.pending.is_empty());
        assert!(!repo.called_prefix("clone_from"));
        assert!(!repo.called_prefix("fetch"));
    }

    #[tokio::test]
    async fn test_preview_lists_pending_without_merging() {
        let h = Harness::new();
        let p = widgets();
        let repo = h.factory.insert(
            "acct",
            &p,
            FakeRepo::new()
                .existing(&p)
                .with_new_commits(&["1a2b3c4 Fix parser"]),
        );

        let preview = h
            .engine(false)
            .preview(&account("acct", vec![p.clone()]), &p)
            .await
            .unwrap();

        assert!(preview.present);
        assert_eq!(preview.pending, vec!["1a2b3c4 Fix parser".to_string()]);
        assert!(repo.called("fetch upstream"));
        assert!(!repo.called_prefix("checkout"));
        assert!(!repo.called_prefix("hard_reset"));
        assert!(!repo.called_prefix("merge"));
        assert!(!repo.called_prefix("push"));
    }
}
