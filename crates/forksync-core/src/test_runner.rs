//! Post-merge test execution

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::{Error, Result};

/// Runs a working copy's tests.
#[async_trait]
pub trait TestRunner: Send + Sync {
    /// `Ok(true)` when tests pass or none are declared, `Ok(false)` when they
    /// fail, `Err` when they could not be run to completion.
    async fn run(&self, workdir: &Path) -> Result<bool>;
}

/// A test command discovered in a working copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl TestCommand {
    fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl std::fmt::Display for TestCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Find the test command a project declares, if any.
///
/// Checked in order: a non-empty `scripts.test` in `package.json`, a
/// `Cargo.toml`, a `Makefile` with a `test:` target.
pub async fn detect_test_command(workdir: &Path) -> Result<Option<TestCommand>> {
    let package_json = workdir.join("package.json");
    if package_json.is_file() {
        let content = tokio::fs::read_to_string(&package_json).await?;
        let manifest: serde_json::Value = serde_json::from_str(&content)?;
        let script = manifest
            .get("scripts")
            .and_then(|s| s.get("test"))
            .and_then(|t| t.as_str())
            .unwrap_or("");
        // npm's placeholder script always fails
        if !script.trim().is_empty() && !script.contains("no test specified") {
            return Ok(Some(TestCommand::new("npm", &["test"])));
        }
    }

    if workdir.join("Cargo.toml").is_file() {
        return Ok(Some(TestCommand::new("cargo", &["test"])));
    }

    let makefile = workdir.join("Makefile");
    if makefile.is_file() {
        let content = tokio::fs::read_to_string(&makefile).await?;
        if content.lines().any(|line| line.starts_with("test:")) {
            return Ok(Some(TestCommand::new("make", &["test"])));
        }
    }

    Ok(None)
}

/// [`TestRunner`] that runs the detected test command as a subprocess.
#[derive(Debug, Clone)]
pub struct CommandTestRunner {
    timeout: Duration,
}

impl CommandTestRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl TestRunner for CommandTestRunner {
    async fn run(&self, workdir: &Path) -> Result<bool> {
        let Some(command) = detect_test_command(workdir).await? else {
            tracing::info!(dir = %workdir.display(), "No test command declared, treating as pass");
            return Ok(true);
        };

        tracing::info!(dir = %workdir.display(), command = %command, "Running tests");

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| Error::TestExecution {
                message: format!(
                    "`{}` timed out after {}s",
                    command,
                    self.timeout.as_secs()
                ),
            })?
            .map_err(|e| Error::TestExecution {
                message: format!("failed to start `{command}`: {e}"),
            })?;

        if output.status.success() {
            tracing::info!(command = %command, "Tests passed");
            Ok(true)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(20).collect();
            tracing::warn!(
                command = %command,
                code = output.status.code().unwrap_or(-1),
                stderr = %tail.into_iter().rev().collect::<Vec<_>>().join("\n"),
                "Tests failed"
            );
            Ok(false)
        }
    }
}
