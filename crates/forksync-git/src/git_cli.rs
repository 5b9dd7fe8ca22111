//! [`RepoClient`] implementation backed by the `git` binary and git2

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use git2::Repository;
use tokio::process::Command;

use crate::client::{Remote, RepoClient, RepoClientFactory, RepoStatus};
use crate::redact::redact_credentials;
use crate::{Error, Result, inspect};

/// Settings shared by every `git` invocation.
#[derive(Debug, Clone)]
pub struct GitOptions {
    /// Upper bound for a single `git` command
    pub timeout: Duration,
    /// Committer name passed as `-c user.name=...`
    pub user_name: Option<String>,
    /// Committer email passed as `-c user.email=...`
    pub user_email: Option<String>,
}

impl Default for GitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            user_name: None,
            user_email: None,
        }
    }
}

/// Captured output of a successful `git` invocation.
#[derive(Debug)]
struct GitOutput {
    stdout: String,
    stderr: String,
}

/// Repository client for one working copy.
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
    options: GitOptions,
}

impl GitCli {
    pub fn new(workdir: impl Into<PathBuf>, options: GitOptions) -> Self {
        Self {
            workdir: workdir.into(),
            options,
        }
    }

    fn open(&self) -> Result<Repository> {
        if !self.workdir.exists() {
            return Err(Error::WorkdirMissing {
                path: self.workdir.clone(),
            });
        }
        Ok(Repository::open(&self.workdir)?)
    }

    /// Run `git <args>` inside the working copy.
    async fn git(&self, args: &[&str]) -> Result<GitOutput> {
        self.git_in(&self.workdir, args).await
    }

    /// Run `git <args>` with `dir` as the current directory.
    ///
    /// Non-zero exits become [`Error::CommandFailed`] with credentials
    /// redacted from both the command line and stderr.
    async fn git_in(&self, dir: &Path, args: &[&str]) -> Result<GitOutput> {
        let command_line = redact_credentials(&format!("git {}", args.join(" ")));
        tracing::debug!(command = %command_line, dir = %dir.display(), "Running git");

        let mut cmd = Command::new("git");
        if let Some(name) = &self.options.user_name {
            cmd.arg("-c").arg(format!("user.name={name}"));
        }
        if let Some(email) = &self.options.user_email {
            cmd.arg("-c").arg(format!("user.email={email}"));
        }
        cmd.args(args)
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.options.timeout, cmd.output())
            .await
            .map_err(|_| Error::Timeout {
                command: command_line.clone(),
                seconds: self.options.timeout.as_secs(),
            })??;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            // Merge conflict summaries go to stdout, everything else to stderr
            let detail = [stderr.trim(), stdout.trim()]
                .iter()
                .filter(|s| !s.is_empty())
                .copied()
                .collect::<Vec<_>>()
                .join("\n");
            return Err(Error::CommandFailed {
                command: command_line,
                code: output.status.code().unwrap_or(-1),
                stderr: redact_credentials(&detail),
            });
        }

        Ok(GitOutput { stdout, stderr })
    }
}

/// Classify the output of a failed `git merge`.
///
/// Git reports content conflicts with `CONFLICT (...)` lines followed by
/// `Automatic merge failed`; anything else (unrelated histories, dirty tree,
/// unknown revision) is a plain failure.
pub fn is_conflict_output(output: &str) -> bool {
    output.contains("CONFLICT") || output.contains("Automatic merge failed")
}

#[async_trait]
impl RepoClient for GitCli {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    async fn exists(&self) -> Result<bool> {
        Ok(inspect::repository_exists(&self.workdir))
    }

    async fn clone_from(&self, url: &str) -> Result<()> {
        let parent = self
            .workdir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        tokio::fs::create_dir_all(&parent).await?;

        let target = self.workdir.to_string_lossy().into_owned();
        self.git_in(&parent, &["clone", url, &target]).await?;
        Ok(())
    }

    async fn set_remote_url(&self, name: &str, url: &str) -> Result<()> {
        self.git(&["remote", "set-url", name, url]).await?;
        Ok(())
    }

    async fn list_remotes(&self) -> Result<Vec<Remote>> {
        let repo = self.open()?;
        inspect::list_remotes(&repo)
    }

    async fn add_remote(&self, name: &str, url: &str) -> Result<()> {
        self.git(&["remote", "add", name, url]).await?;
        Ok(())
    }

    async fn fetch(&self, args: &[&str]) -> Result<()> {
        let mut full = vec!["fetch"];
        full.extend_from_slice(args);
        self.git(&full).await?;
        Ok(())
    }

    async fn checkout(&self, branch: &str) -> Result<()> {
        let repo = self.open()?;
        if inspect::local_branch_exists(&repo, branch)? {
            self.git(&["checkout", branch]).await?;
            return Ok(());
        }

        // Picks up a matching remote-tracking branch when there is one
        match self.git(&["checkout", branch]).await {
            Ok(_) => Ok(()),
            Err(Error::CommandFailed { stderr, .. }) => {
                tracing::debug!(branch, error = %stderr, "No branch to check out, creating it");
                self.git(&["checkout", "-b", branch]).await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn set_tracking_branch(&self, remote_ref: &str) -> Result<()> {
        let flag = format!("--set-upstream-to={remote_ref}");
        self.git(&["branch", &flag]).await?;
        Ok(())
    }

    async fn merge(&self, reference: &str) -> Result<()> {
        match self.git(&["merge", "--no-edit", reference]).await {
            Ok(_) => Ok(()),
            Err(Error::CommandFailed { stderr, .. }) if is_conflict_output(&stderr) => {
                Err(Error::MergeConflict { message: stderr })
            }
            Err(e) => Err(e),
        }
    }

    async fn abort_merge(&self) -> Result<()> {
        self.git(&["merge", "--abort"]).await?;
        Ok(())
    }

    async fn status(&self) -> Result<RepoStatus> {
        let repo = self.open()?;
        let conflicted = inspect::conflicted_paths(&repo)?;
        Ok(RepoStatus { conflicted })
    }

    async fn stage_files(&self, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["add", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.git(&args).await?;
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<()> {
        self.git(&["commit", "--no-verify", "-m", message]).await?;
        Ok(())
    }

    async fn push(&self, remote: &str, branch: &str) -> Result<()> {
        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        let output = self.git(&["push", remote, &refspec]).await?;
        tracing::debug!(remote, branch, output = %redact_credentials(output.stderr.trim()), "Pushed");
        Ok(())
    }

    async fn list_new_commits(&self, range: &str) -> Result<String> {
        let repo = self.open()?;
        inspect::list_commits_in_range(&repo, range)
    }

    async fn head_revision(&self) -> Result<String> {
        let repo = self.open()?;
        inspect::head_revision(&repo)
    }

    async fn hard_reset(&self, revision: &str) -> Result<()> {
        let output = self.git(&["reset", "--hard", revision]).await?;
        tracing::debug!(revision, output = %output.stdout.trim(), "Hard reset");
        Ok(())
    }

    async fn read_file_at(&self, revision: &str, path: &str) -> Result<String> {
        let repo = self.open()?;
        inspect::read_file_at(&repo, revision, path)
    }
}

/// Opens [`GitCli`] clients with shared [`GitOptions`].
#[derive(Debug, Clone, Default)]
pub struct GitCliFactory {
    options: GitOptions,
}

impl GitCliFactory {
    pub fn new(options: GitOptions) -> Self {
        Self { options }
    }
}

impl RepoClientFactory for GitCliFactory {
    fn open(&self, workdir: &Path) -> Arc<dyn RepoClient> {
        Arc::new(GitCli::new(workdir, self.options.clone()))
    }
}
