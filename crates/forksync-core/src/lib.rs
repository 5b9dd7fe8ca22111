//! Fork synchronization engine for forksync
//!
//! This crate keeps forks in line with their upstreams:
//!
//! - **Identifiers**: `owner/repo:branch` parsing and clone URLs
//! - **SyncEngine**: the per-pair state machine (init, drift check, merge,
//!   conflict delegation, rollback, publish, test gate)
//! - **BatchOrchestrator**: sequential runs over an account's pairs with
//!   failure isolation and reporting
//! - **Configuration**: accounts, tokens, and settings from a TOML file
//!
//! # Architecture
//!
//! ```text
//!                 forksync-cli
//!                      |
//!                forksync-core
//!              /       |        \
//!   forksync-git  ConflictResolver  TestRunner / Reporter
//!                 (forksync-resolver)
//! ```
//!
//! Collaborators are injected as trait objects, so the engine can be driven
//! against in-memory fakes in tests.

pub mod batch;
pub mod config;
pub mod error;
pub mod identifier;
pub mod logger;
pub mod outcome;
pub mod report;
pub mod resolver;
pub mod sync;
pub mod test_runner;
pub mod workdir;

pub use batch::{BatchFilter, BatchOrchestrator, should_report};
pub use config::{Account, Config, ModelConfig, ReportConfig, default_config_path};
pub use error::{Error, Result};
pub use identifier::{RepoPair, RepoRef};
pub use logger::RepoLogger;
pub use outcome::{
    BatchResult, BatchSummary, MergeFailure, MergeKind, SyncOutcome, SyncStatus, TestsStatus,
};
pub use report::{CommandReporter, FileReporter, MultiReporter, Reporter};
pub use resolver::{ConflictResolver, Resolution};
pub use sync::{DriftPreview, EngineOptions, SyncEngine};
pub use test_runner::{CommandTestRunner, TestRunner, detect_test_command};
pub use workdir::{RunLock, working_copy_dir};
