//! Repository client trait consumed by the sync engine

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;

/// A configured remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    pub name: String,
    pub url: String,
}

/// Working-copy status as far as the sync engine cares about it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoStatus {
    /// Paths with unresolved conflicts, relative to the repository root
    pub conflicted: Vec<String>,
}

/// Version-control primitives for a single working copy.
///
/// Every operation is asynchronous and may fail. Implementations are expected
/// to bound each call with their own timeout; callers do not add one.
#[async_trait]
pub trait RepoClient: Send + Sync {
    /// Root directory of the working copy this client operates on
    fn workdir(&self) -> &Path;

    /// Whether a repository already exists at the working directory
    async fn exists(&self) -> Result<bool>;

    /// Clone `url` into the working directory
    async fn clone_from(&self, url: &str) -> Result<()>;

    async fn set_remote_url(&self, name: &str, url: &str) -> Result<()>;

    async fn list_remotes(&self) -> Result<Vec<Remote>>;

    async fn add_remote(&self, name: &str, url: &str) -> Result<()>;

    /// Fetch with the given arguments, e.g. `["--all"]` or `["upstream"]`
    async fn fetch(&self, args: &[&str]) -> Result<()>;

    /// Check out `branch`, creating it locally if it does not exist
    async fn checkout(&self, branch: &str) -> Result<()>;

    /// Bind the current branch to a remote-tracking reference such as `origin/main`
    async fn set_tracking_branch(&self, remote_ref: &str) -> Result<()>;

    /// Merge `reference` into the checked-out branch.
    ///
    /// Content conflicts are reported as [`crate::Error::MergeConflict`] and
    /// leave the merge in progress.
    async fn merge(&self, reference: &str) -> Result<()>;

    async fn abort_merge(&self) -> Result<()>;

    async fn status(&self) -> Result<RepoStatus>;

    async fn stage_files(&self, paths: &[String]) -> Result<()>;

    async fn commit(&self, message: &str) -> Result<()>;

    async fn push(&self, remote: &str, branch: &str) -> Result<()>;

    /// List commits selected by a range expression such as `main..upstream/main`,
    /// one per line
    async fn list_new_commits(&self, range: &str) -> Result<String>;

    /// Full hash of the commit HEAD points at
    async fn head_revision(&self) -> Result<String>;

    async fn hard_reset(&self, revision: &str) -> Result<()>;

    async fn read_file_at(&self, revision: &str, path: &str) -> Result<String>;
}

/// Opens a [`RepoClient`] for a working directory.
pub trait RepoClientFactory: Send + Sync {
    fn open(&self, workdir: &Path) -> Arc<dyn RepoClient>;
}
