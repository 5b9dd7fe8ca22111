//! Error types for forksync-core

use std::path::PathBuf;

/// Result type for forksync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in forksync-core operations
///
/// The sync-specific variants follow the stages of the per-repository state
/// machine. Every one of them is converted into an error outcome at the batch
/// boundary; none aborts a batch.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration file not found at expected path
    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parsed but failed validation
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Repository identifier not of the form `owner/repo:branch`
    #[error("Invalid repository identifier '{value}': expected owner/repo:branch")]
    InvalidIdentifier { value: String },

    /// Clone, remote, fetch, or checkout failed while preparing the working copy
    #[error("Failed to initialize repository: {source}")]
    Initialization { source: forksync_git::Error },

    /// Fetching upstream or listing new commits failed
    #[error("Failed to check upstream drift: {source}")]
    DriftCheck { source: forksync_git::Error },

    /// Merge failed for a reason other than content conflicts
    #[error("Merge of {reference} failed: {source}")]
    CleanMergeFailure {
        reference: String,
        source: forksync_git::Error,
    },

    /// The merge reported conflicts but status listed no conflicted files
    #[error("Failed to identify conflicted files for resolution")]
    ConflictDiscovery,

    /// The conflict resolver could not resolve every file
    #[error("Conflict resolution failed: {reason}")]
    ConflictResolution { reason: String },

    /// Both `merge --abort` and the hard reset to the anchor failed
    #[error(
        "Rollback failed for {path}, manual intervention required \
         (merge --abort: {abort}; reset --hard {anchor}: {reset})"
    )]
    RollbackFailure {
        path: PathBuf,
        anchor: String,
        abort: String,
        reset: String,
    },

    /// Committing or pushing a completed merge failed
    #[error("Failed to publish merge: {source}")]
    Publish { source: forksync_git::Error },

    /// The post-merge test command could not be run to completion
    #[error("Test execution failed: {message}")]
    TestExecution { message: String },

    /// Rendering or delivering a report failed
    #[error("Report delivery failed: {message}")]
    Report { message: String },

    /// Another run holds the working directory lock
    #[error("Another forksync run is in progress (lock held at {path})")]
    RunInProgress { path: PathBuf },

    // Transparent wrappers for underlying errors
    /// Git error from forksync-git
    #[error(transparent)]
    Git(#[from] forksync_git::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
}
