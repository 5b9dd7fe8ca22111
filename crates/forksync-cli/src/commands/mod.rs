//! Command implementations for forksync-cli

pub mod check_config;
pub mod run;
pub mod status;
pub mod watch;

pub use check_config::run_check_config;
pub use run::run_sync;
pub use status::run_status;
pub use watch::run_watch;
