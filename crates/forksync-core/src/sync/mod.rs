//! Per-repository synchronization
//!
//! This module provides:
//! - **engine**: the state machine that merges one upstream into one fork
//! - **preview**: pending upstream commits, without touching the work tree

mod engine;
mod preview;

pub use engine::{
    EngineOptions, INIT_FAILED_MESSAGE, ORIGIN_REMOTE, SyncEngine, UPSTREAM_REMOTE,
    resolution_commit_message,
};
pub use preview::DriftPreview;
