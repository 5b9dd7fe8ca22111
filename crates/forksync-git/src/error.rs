//! Error types for forksync-git

use std::path::PathBuf;

/// Result type for forksync-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in forksync-git operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A `git` invocation exited non-zero
    #[error("`{command}` failed (exit code {code}): {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    /// A merge stopped because of content conflicts
    #[error("Merge conflict: {message}")]
    MergeConflict { message: String },

    #[error("`{command}` timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("Remote '{name}' not found")]
    RemoteNotFound { name: String },

    #[error("Path '{path}' not found at revision '{revision}'")]
    FileNotFound { revision: String, path: String },

    #[error("File '{path}' at revision '{revision}' is not valid UTF-8")]
    NotUtf8 { revision: String, path: String },

    #[error("Working copy not found at {path}")]
    WorkdirMissing { path: PathBuf },
}

impl Error {
    /// Whether this error reports a content conflict from a merge.
    pub fn is_merge_conflict(&self) -> bool {
        matches!(self, Error::MergeConflict { .. })
    }
}
