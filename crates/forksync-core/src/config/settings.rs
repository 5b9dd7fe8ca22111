//! Configuration file sections

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::account::{Account, AccountConfig};
use crate::{Error, Result};

/// File name looked up in the working directory and the user config dir
pub const CONFIG_FILE_NAME: &str = "forksync.toml";

fn default_workdir() -> PathBuf {
    PathBuf::from("repos")
}

fn default_test_timeout_secs() -> u64 {
    900
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_host() -> String {
    "github.com".to_string()
}

fn default_git_timeout_secs() -> u64 {
    300
}

fn default_user_name() -> String {
    "forksync".to_string()
}

fn default_user_email() -> String {
    "forksync@localhost".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_model_timeout_secs() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_file_bytes() -> usize {
    200_000
}

/// `[run]`: where working copies live and what happens after a merge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Parent directory of all working copies
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,

    /// Run the project's test command after a successful merge
    #[serde(default)]
    pub run_tests: bool,

    #[serde(default = "default_test_timeout_secs")]
    pub test_timeout_secs: u64,

    /// Period between runs in watch mode
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workdir: default_workdir(),
            run_tests: false,
            test_timeout_secs: default_test_timeout_secs(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl RunConfig {
    pub fn test_timeout(&self) -> Duration {
        Duration::from_secs(self.test_timeout_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// `[git]`: remote host and command settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    /// Host used to build clone URLs
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_git_timeout_secs")]
    pub timeout_secs: u64,

    /// Committer identity for merge and resolution commits
    #[serde(default = "default_user_name")]
    pub user_name: String,

    #[serde(default = "default_user_email")]
    pub user_email: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            timeout_secs: default_git_timeout_secs(),
            user_name: default_user_name(),
            user_email: default_user_email(),
        }
    }
}

impl GitConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `[model]`: text-generation backend used for conflict resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-request timeout
    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default)]
    pub temperature: f32,

    /// Conflicted files larger than this are not sent to the model
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_model_timeout_secs(),
            max_retries: default_max_retries(),
            temperature: 0.0,
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `[report]`: summary delivery after each batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Directory for markdown and JSON reports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Command receiving an email-formatted report on stdin, e.g. `sendmail -t`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default)]
    pub recipients: Vec<String>,

    /// Report even when every repository was skipped
    #[serde(default)]
    pub always: bool,
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub git: GitConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

impl Config {
    /// Parse and validate configuration from TOML content
    ///
    /// # Example
    ///
    /// ```
    /// use forksync_core::config::Config;
    ///
    /// let config = Config::parse(r#"
    /// [run]
    /// workdir = "/tmp/forksync"
    ///
    /// [[accounts]]
    /// name = "personal"
    /// token = "t"
    /// repos = [{ upstream = "acme/widgets:main", fork = "me/widgets:main" }]
    /// "#).unwrap();
    ///
    /// assert_eq!(config.accounts.len(), 1);
    /// assert_eq!(config.git.host, "github.com");
    /// ```
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        tracing::debug!(path = %path.display(), accounts = config.accounts.len(), "Loaded configuration");
        Ok(config)
    }

    /// Structural checks that do not depend on the environment.
    ///
    /// Tokens are checked in [`Config::accounts`], where the environment is read.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(Error::InvalidConfig { message });

        if self.git.host.trim().is_empty() {
            return invalid("git.host must not be empty".into());
        }
        if self.git.timeout_secs == 0 {
            return invalid("git.timeout_secs must be greater than zero".into());
        }
        if self.model.timeout_secs == 0 {
            return invalid("model.timeout_secs must be greater than zero".into());
        }
        if self.run.test_timeout_secs == 0 {
            return invalid("run.test_timeout_secs must be greater than zero".into());
        }
        if self.run.interval_secs == 0 {
            return invalid("run.interval_secs must be greater than zero".into());
        }
        if self.report.command.is_some() && self.report.recipients.is_empty() {
            return invalid("report.command requires at least one recipient".into());
        }

        let mut seen = HashSet::new();
        for account in &self.accounts {
            if account.name.trim().is_empty() {
                return invalid("account name must not be empty".into());
            }
            // Working-copy directories may live on a case-insensitive filesystem
            if !seen.insert(account.name.to_lowercase()) {
                return invalid(format!("duplicate account '{}'", account.name));
            }
            for pair in &account.repos {
                crate::RepoPair::parse(&pair.upstream, &pair.fork).map_err(|e| {
                    Error::InvalidConfig {
                        message: format!("account '{}': {}", account.name, e),
                    }
                })?;
            }
        }

        Ok(())
    }

    /// Resolve every account against the process environment.
    pub fn accounts(&self) -> Result<Vec<Account>> {
        self.accounts_with_env(|var| std::env::var(var).ok())
    }

    /// Resolve every account using `env` for variable lookups.
    pub fn accounts_with_env(&self, env: impl Fn(&str) -> Option<String>) -> Result<Vec<Account>> {
        self.accounts.iter().map(|a| a.resolve(&env)).collect()
    }
}

/// Where to look for a configuration file when none is given.
///
/// Prefers `./forksync.toml`, then `<config dir>/forksync/config.toml`.
pub fn default_config_path() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    match dirs::config_dir() {
        Some(dir) => {
            let user = dir.join("forksync").join("config.toml");
            if user.exists() { user } else { local }
        }
        None => local,
    }
}
