//! Per-repository logging capability
//!
//! The sync engine builds one [`RepoLogger`] per repository pair and hands it
//! to every collaborator that logs on the pair's behalf, so each event carries
//! the account and repository without global state.

use std::fmt::Display;

use tracing::Span;

/// Logger bound to one `(account, repository)` pair.
#[derive(Debug, Clone)]
pub struct RepoLogger {
    span: Span,
    account: String,
    repository: String,
}

impl RepoLogger {
    pub fn new(account: &str, repository: &str) -> Self {
        let span = tracing::info_span!("repo", account = %account, repository = %repository);
        Self {
            span,
            account: account.to_string(),
            repository: repository.to_string(),
        }
    }

    /// Span all events of this pair are recorded under.
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn debug(&self, message: impl Display) {
        tracing::debug!(parent: &self.span, "{message}");
    }

    pub fn info(&self, message: impl Display) {
        tracing::info!(parent: &self.span, "{message}");
    }

    pub fn warn(&self, message: impl Display) {
        tracing::warn!(parent: &self.span, "{message}");
    }

    pub fn error(&self, message: impl Display) {
        tracing::error!(parent: &self.span, "{message}");
    }
}
