//! Drift preview without merging

use std::path::PathBuf;

use serde::Serialize;

use super::engine::SyncEngine;
use crate::config::Account;
use crate::identifier::RepoPair;
use crate::{Error, Result};

/// Pending upstream commits for one pair, as of a fresh upstream fetch.
#[derive(Debug, Clone, Serialize)]
pub struct DriftPreview {
    pub upstream: String,
    pub fork: String,
    pub workdir: PathBuf,
    /// Whether a working copy exists yet; without one nothing is fetched
    pub present: bool,
    /// `<short hash> <summary>` per pending commit
    pub pending: Vec<String>,
}

impl SyncEngine {
    /// Report pending upstream commits for a pair without merging.
    ///
    /// Pairs that have never been synchronized have no working copy and
    /// report `present: false`; the preview does not clone. For existing
    /// working copies it fetches the upstream remote, adding or correcting
    /// that remote if needed, but never checks out or touches the work tree.
    pub async fn preview(&self, account: &Account, pair: &RepoPair) -> Result<DriftPreview> {
        let repo = self.open(account, pair);
        let mut preview = DriftPreview {
            upstream: pair.upstream.to_string(),
            fork: pair.fork.to_string(),
            workdir: repo.workdir().to_path_buf(),
            present: false,
            pending: Vec::new(),
        };

        if !repo.exists().await? {
            return Ok(preview);
        }
        preview.present = true;

        let logger = crate::logger::RepoLogger::new(&account.name, &pair.fork.full_name());
        let upstream_url = pair.upstream.public_url(&self.options().git_host);
        self.ensure_upstream_remote(repo.as_ref(), &upstream_url, &logger)
            .await?;

        preview.pending = self
            .pending_commits(repo.as_ref(), pair)
            .await
            .map_err(|source| Error::DriftCheck { source })?;

        Ok(preview)
    }
}
