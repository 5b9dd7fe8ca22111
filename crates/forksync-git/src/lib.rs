//! Repository client for forksync
//!
//! Exposes the version-control primitives the sync engine drives, behind the
//! [`RepoClient`] trait. The default implementation, [`GitCli`], runs the
//! `git` binary for anything that touches the network or the working tree and
//! reads repository state directly through `git2`.

pub mod client;
pub mod error;
pub mod git_cli;
pub mod inspect;
pub mod redact;

pub use client::{Remote, RepoClient, RepoClientFactory, RepoStatus};
pub use error::{Error, Result};
pub use git_cli::{GitCli, GitCliFactory, GitOptions};
pub use redact::redact_credentials;
