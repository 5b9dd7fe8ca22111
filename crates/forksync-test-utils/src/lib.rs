//! Shared test utilities for the forksync workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`git`]: real git repositories built with the `git` CLI
//! - [`remotes`]: [`ForkFixture`], an upstream/fork pair of local remotes

pub mod git;
pub mod remotes;
