//! Wiring configuration into engines, orchestrators, and reporters

use std::path::{Path, PathBuf};
use std::sync::Arc;

use forksync_core::config::{Account, Config};
use forksync_core::{
    BatchOrchestrator, CommandReporter, CommandTestRunner, ConflictResolver, EngineOptions,
    FileReporter, MultiReporter, Reporter, SyncEngine, default_config_path,
};
use forksync_git::{GitCliFactory, GitOptions};
use forksync_resolver::ModelResolver;

use crate::error::{CliError, Result};

/// Loaded configuration plus resolved accounts.
pub struct Context {
    pub path: PathBuf,
    pub config: Config,
    pub accounts: Vec<Account>,
}

impl Context {
    /// Load `path`, or the default location, and resolve every account.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
        let config = Config::load(&path)?;
        let accounts = config.accounts()?;
        Ok(Self {
            path,
            config,
            accounts,
        })
    }

    /// Parent directory of all working copies.
    ///
    /// A relative `run.workdir` is taken relative to the configuration file.
    pub fn workdir_root(&self) -> PathBuf {
        let workdir = &self.config.run.workdir;
        if workdir.is_absolute() {
            return workdir.clone();
        }
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join(workdir),
            _ => workdir.clone(),
        }
    }

    /// Fail early when `--account` names nothing in the configuration.
    pub fn check_account(&self, name: Option<&str>) -> Result<()> {
        match name {
            Some(name) if !self.accounts.iter().any(|a| a.name == name) => Err(CliError::user(
                format!("No account named '{}' in {}", name, self.path.display()),
            )),
            _ => Ok(()),
        }
    }

    pub fn engine(&self, resolver: Arc<dyn ConflictResolver>) -> SyncEngine {
        let git = GitOptions {
            timeout: self.config.git.timeout(),
            user_name: Some(self.config.git.user_name.clone()),
            user_email: Some(self.config.git.user_email.clone()),
        };
        SyncEngine::new(
            Arc::new(GitCliFactory::new(git)),
            resolver,
            Arc::new(CommandTestRunner::new(self.config.run.test_timeout())),
            EngineOptions {
                workdir_root: self.workdir_root(),
                git_host: self.config.git.host.clone(),
                model: self.config.model.clone(),
                run_tests: self.config.run.run_tests,
            },
        )
    }

    /// Reporters enabled by `[report]`, if any.
    pub fn reporter(&self) -> Result<Option<Arc<dyn Reporter>>> {
        let report = &self.config.report;
        if !report.enabled {
            return Ok(None);
        }

        let mut reporters = MultiReporter::new();
        if let Some(dir) = &report.dir {
            reporters = reporters.with(FileReporter::new(dir));
        }
        if let Some(command) = &report.command {
            reporters = reporters.with(CommandReporter::parse(command)?);
        }

        if reporters.is_empty() {
            tracing::warn!("Reporting is enabled but neither report.dir nor report.command is set");
            return Ok(None);
        }
        let reporter: Arc<dyn Reporter> = Arc::new(reporters);
        Ok(Some(reporter))
    }

    /// Orchestrator with the model resolver and configured reporters.
    pub fn orchestrator(&self) -> Result<BatchOrchestrator> {
        let resolver = ModelResolver::from_config(&self.config.model)?;
        let orchestrator = BatchOrchestrator::new(Arc::new(self.engine(Arc::new(resolver))));
        Ok(match self.reporter()? {
            Some(reporter) => orchestrator.with_reporter(reporter, self.config.report.clone()),
            None => orchestrator,
        })
    }
}
