//! Conflict resolver capability

use async_trait::async_trait;
use forksync_git::RepoClient;

use crate::config::ModelConfig;
use crate::logger::RepoLogger;

/// What a resolver reports back to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Every conflicted file was rewritten and staged
    Resolved,
    /// At least one file could not be resolved; nothing should be committed
    Failed { reason: String },
}

impl Resolution {
    pub fn failed(reason: impl Into<String>) -> Self {
        Resolution::Failed {
            reason: reason.into(),
        }
    }
}

/// Rewrites conflicted files into a mergeable state.
///
/// On [`Resolution::Resolved`] every path in `conflicted` must be staged in
/// `repo` and ready to commit. Paths are relative to the repository root.
#[async_trait]
pub trait ConflictResolver: Send + Sync {
    async fn resolve(
        &self,
        repo: &dyn RepoClient,
        conflicted: &[String],
        model: &ModelConfig,
        logger: &RepoLogger,
    ) -> Resolution;
}
