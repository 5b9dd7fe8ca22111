//! Configuration loading and validation
//!
//! A single TOML file describes run settings, the git and model backends,
//! reporting, and the accounts whose repository pairs are synchronized.
//! Everything is validated at load time so a malformed identifier or a
//! missing token never reaches the sync engine.

mod account;
mod settings;

pub use account::{Account, AccountConfig, RepoPairConfig};
pub use settings::{
    CONFIG_FILE_NAME, Config, GitConfig, ModelConfig, ReportConfig, RunConfig,
    default_config_path,
};
