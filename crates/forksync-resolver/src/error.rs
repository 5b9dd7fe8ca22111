//! Error types for forksync-resolver

use std::path::PathBuf;

/// Result type for forksync-resolver operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configured API key variable is unset or empty
    #[error("Environment variable {var} is not set; it must hold the model API key")]
    MissingApiKey { var: String },

    /// The endpoint answered with a non-success status
    #[error("Model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response carried no usable content
    #[error("Model returned an empty response")]
    EmptyResponse,

    /// The rewritten file still contains conflict markers
    #[error("Model output for {path} still contains conflict markers")]
    ConflictMarkers { path: String },

    #[error("{path} is {size} bytes, above the {limit}-byte limit")]
    TooLarge {
        path: String,
        size: usize,
        limit: usize,
    },

    /// The conflicted file is absent from the working tree (deleted on one side)
    #[error("{path} does not exist in the working tree")]
    Missing { path: PathBuf },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Git(#[from] forksync_git::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether a retry might succeed: network failures, rate limits, and
    /// server errors.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Status { status, .. } => *status == 429 || *status >= 500,
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}
