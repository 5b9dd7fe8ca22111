//! In-memory collaborators for driving the sync engine in tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use forksync_core::config::{Account, ModelConfig, ReportConfig};
use forksync_core::{
    BatchSummary, ConflictResolver, EngineOptions, RepoLogger, RepoPair, Reporter, Resolution,
    SyncEngine, TestRunner,
};
use forksync_git::{Remote, RepoClient, RepoClientFactory, RepoStatus};

pub const WORKDIR_ROOT: &str = "/fake/repos";
pub const ANCHOR: &str = "anchor0000";
pub const TOKEN: &str = "tok";

/// How a scripted merge behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeBehavior {
    #[default]
    Clean,
    Conflict,
    /// Fails for a reason other than conflicts
    Fail,
}

#[derive(Debug, Default)]
struct Script {
    exists: bool,
    remotes: Vec<Remote>,
    new_commits: Vec<String>,
    merge: MergeBehavior,
    conflicted: Vec<String>,
    /// Calls whose log line starts with one of these fail
    failing: Vec<String>,
}

/// Scripted repository client recording every call as a log line.
#[derive(Debug)]
pub struct FakeRepo {
    workdir: PathBuf,
    script: Script,
    calls: Mutex<Vec<String>>,
}

impl FakeRepo {
    pub fn new() -> Self {
        Self {
            workdir: PathBuf::new(),
            script: Script::default(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A working copy from an earlier run, with both remotes configured.
    pub fn existing(mut self, pair: &RepoPair) -> Self {
        self.script.exists = true;
        self.script.remotes = vec![
            Remote {
                name: "origin".into(),
                url: pair.fork.authenticated_url("github.com", TOKEN),
            },
            Remote {
                name: "upstream".into(),
                url: pair.upstream.public_url("github.com"),
            },
        ];
        self
    }

    pub fn with_remote(mut self, name: &str, url: &str) -> Self {
        self.script.remotes.retain(|r| r.name != name);
        self.script.remotes.push(Remote {
            name: name.into(),
            url: url.into(),
        });
        self
    }

    pub fn with_new_commits(mut self, commits: &[&str]) -> Self {
        self.script.new_commits = commits.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn merge(mut self, behavior: MergeBehavior) -> Self {
        self.script.merge = behavior;
        self
    }

    pub fn conflicted(mut self, paths: &[&str]) -> Self {
        self.script.conflicted = paths.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Make every call whose log line starts with `prefix` fail.
    pub fn failing(mut self, prefix: &str) -> Self {
        self.script.failing.push(prefix.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, line: &str) -> bool {
        self.calls().iter().any(|c| c == line)
    }

    pub fn called_prefix(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }

    pub fn count(&self, line: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == line).count()
    }

    /// Index of the first call equal to `line`.
    pub fn position(&self, line: &str) -> Option<usize> {
        self.calls().iter().position(|c| c == line)
    }

    fn record(&self, line: String) -> forksync_git::Result<()> {
        let fails = self.script.failing.iter().any(|p| line.starts_with(p));
        self.calls.lock().unwrap().push(line.clone());
        if fails {
            return Err(forksync_git::Error::CommandFailed {
                command: line,
                code: 1,
                stderr: "scripted failure".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RepoClient for FakeRepo {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    async fn exists(&self) -> forksync_git::Result<bool> {
        self.record("exists".into())?;
        Ok(self.script.exists)
    }

    async fn clone_from(&self, url: &str) -> forksync_git::Result<()> {
        self.record(format!("clone_from {url}"))
    }

    async fn set_remote_url(&self, name: &str, url: &str) -> forksync_git::Result<()> {
        self.record(format!("set_remote_url {name} {url}"))
    }

    async fn list_remotes(&self) -> forksync_git::Result<Vec<Remote>> {
        self.record("list_remotes".into())?;
        Ok(self.script.remotes.clone())
    }

    async fn add_remote(&self, name: &str, url: &str) -> forksync_git::Result<()> {
        self.record(format!("add_remote {name} {url}"))
    }

    async fn fetch(&self, args: &[&str]) -> forksync_git::Result<()> {
        self.record(format!("fetch {}", args.join(" ")))
    }

    async fn checkout(&self, branch: &str) -> forksync_git::Result<()> {
        self.record(format!("checkout {branch}"))
    }

    async fn set_tracking_branch(&self, remote_ref: &str) -> forksync_git::Result<()> {
        self.record(format!("set_tracking_branch {remote_ref}"))
    }

    async fn merge(&self, reference: &str) -> forksync_git::Result<()> {
        self.record(format!("merge {reference}"))?;
        match self.script.merge {
            MergeBehavior::Clean => Ok(()),
            MergeBehavior::Conflict => Err(forksync_git::Error::MergeConflict {
                message: "CONFLICT (content): Merge conflict".into(),
            }),
            MergeBehavior::Fail => Err(forksync_git::Error::CommandFailed {
                command: format!("git merge {reference}"),
                code: 128,
                stderr: "fatal: refusing to merge unrelated histories".into(),
            }),
        }
    }

    async fn abort_merge(&self) -> forksync_git::Result<()> {
        self.record("abort_merge".into())
    }

    async fn status(&self) -> forksync_git::Result<RepoStatus> {
        self.record("status".into())?;
        Ok(RepoStatus {
            conflicted: self.script.conflicted.clone(),
        })
    }

    async fn stage_files(&self, paths: &[String]) -> forksync_git::Result<()> {
        self.record(format!("stage_files {}", paths.join(" ")))
    }

    async fn commit(&self, message: &str) -> forksync_git::Result<()> {
        self.record(format!("commit {message}"))
    }

    async fn push(&self, remote: &str, branch: &str) -> forksync_git::Result<()> {
        self.record(format!("push {remote} {branch}"))
    }

    async fn list_new_commits(&self, range: &str) -> forksync_git::Result<String> {
        self.record(format!("list_new_commits {range}"))?;
        Ok(self.script.new_commits.join("\n"))
    }

    async fn head_revision(&self) -> forksync_git::Result<String> {
        self.record("head_revision".into())?;
        Ok(ANCHOR.to_string())
    }

    async fn hard_reset(&self, revision: &str) -> forksync_git::Result<()> {
        self.record(format!("hard_reset {revision}"))
    }

    async fn read_file_at(&self, revision: &str, path: &str) -> forksync_git::Result<String> {
        self.record(format!("read_file_at {revision} {path}"))?;
        Ok(String::new())
    }
}

/// Hands out scripted repos keyed by working-copy directory name.
///
/// Unknown directories get a fresh repo with no upstream drift.
#[derive(Default)]
pub struct FakeRepoFactory {
    repos: Mutex<HashMap<String, Arc<FakeRepo>>>,
    opened: Mutex<Vec<String>>,
}

impl FakeRepoFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `repo` for the working copy of `fork` under `account`.
    pub fn insert(&self, account: &str, pair: &RepoPair, repo: FakeRepo) -> Arc<FakeRepo> {
        let workdir =
            forksync_core::working_copy_dir(Path::new(WORKDIR_ROOT), account, &pair.fork);
        let repo = Arc::new(FakeRepo {
            workdir: workdir.clone(),
            ..repo
        });
        self.repos
            .lock()
            .unwrap()
            .insert(dir_name(&workdir), Arc::clone(&repo));
        repo
    }

    /// Directory names opened so far, in order.
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl RepoClientFactory for FakeRepoFactory {
    fn open(&self, workdir: &Path) -> Arc<dyn RepoClient> {
        let name = dir_name(workdir);
        self.opened.lock().unwrap().push(name.clone());
        let mut repos = self.repos.lock().unwrap();
        let repo = repos.entry(name).or_insert_with(|| {
            Arc::new(FakeRepo {
                workdir: workdir.to_path_buf(),
                ..FakeRepo::new()
            })
        });
        Arc::clone(repo) as Arc<dyn RepoClient>
    }
}

/// Resolver returning a fixed resolution, staging files on success.
pub struct FakeResolver {
    resolution: Resolution,
    seen: Mutex<Vec<Vec<String>>>,
}

impl FakeResolver {
    pub fn resolving() -> Self {
        Self::returning(Resolution::Resolved)
    }

    pub fn failing(reason: &str) -> Self {
        Self::returning(Resolution::failed(reason))
    }

    fn returning(resolution: Resolution) -> Self {
        Self {
            resolution,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Conflicted file lists passed in, one entry per invocation.
    pub fn seen(&self) -> Vec<Vec<String>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConflictResolver for FakeResolver {
    async fn resolve(
        &self,
        repo: &dyn RepoClient,
        conflicted: &[String],
        _model: &ModelConfig,
        logger: &RepoLogger,
    ) -> Resolution {
        self.seen.lock().unwrap().push(conflicted.to_vec());
        if self.resolution == Resolution::Resolved {
            if let Err(e) = repo.stage_files(conflicted).await {
                return Resolution::failed(e.to_string());
            }
        }
        logger.debug("fake resolver done");
        self.resolution.clone()
    }
}

/// Scripted test-gate result
#[derive(Debug, Clone, Copy)]
pub enum TestResult {
    Pass,
    Fail,
    Error,
}

pub struct FakeTestRunner {
    result: TestResult,
    runs: Mutex<usize>,
}

impl FakeTestRunner {
    pub fn new(result: TestResult) -> Self {
        Self {
            result,
            runs: Mutex::new(0),
        }
    }

    pub fn runs(&self) -> usize {
        *self.runs.lock().unwrap()
    }
}

#[async_trait]
impl TestRunner for FakeTestRunner {
    async fn run(&self, _workdir: &Path) -> forksync_core::Result<bool> {
        *self.runs.lock().unwrap() += 1;
        match self.result {
            TestResult::Pass => Ok(true),
            TestResult::Fail => Ok(false),
            TestResult::Error => Err(forksync_core::Error::TestExecution {
                message: "timed out".into(),
            }),
        }
    }
}

/// Reporter keeping every summary it receives.
#[derive(Default)]
pub struct RecordingReporter {
    fail: bool,
    summaries: Mutex<Vec<BatchSummary>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn summaries(&self) -> Vec<BatchSummary> {
        self.summaries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Reporter for RecordingReporter {
    async fn report(&self, _config: &ReportConfig, summary: &BatchSummary) -> forksync_core::Result<()> {
        self.summaries.lock().unwrap().push(summary.clone());
        if self.fail {
            return Err(forksync_core::Error::Report {
                message: "smtp unreachable".into(),
            });
        }
        Ok(())
    }
}

pub fn pair(upstream: &str, fork: &str) -> RepoPair {
    RepoPair::parse(upstream, fork).unwrap()
}

pub fn account(name: &str, repos: Vec<RepoPair>) -> Account {
    Account::new(name, TOKEN, repos)
}

pub fn options(run_tests: bool) -> EngineOptions {
    EngineOptions {
        workdir_root: PathBuf::from(WORKDIR_ROOT),
        git_host: "github.com".into(),
        model: ModelConfig::default(),
        run_tests,
    }
}

pub fn engine(
    factory: Arc<FakeRepoFactory>,
    resolver: Arc<FakeResolver>,
    runner: Arc<FakeTestRunner>,
    run_tests: bool,
) -> SyncEngine {
    SyncEngine::new(factory, resolver, runner, options(run_tests))
}
