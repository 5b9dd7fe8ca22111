//! Reports piped into an external command such as `sendmail -t`

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::Reporter;
use super::render::{render_markdown, subject_line};
use crate::config::ReportConfig;
use crate::outcome::BatchSummary;
use crate::{Error, Result};

/// Pipes an email-formatted report to a command's stdin.
///
/// The command line is split on whitespace; no shell is involved.
#[derive(Debug, Clone)]
pub struct CommandReporter {
    program: String,
    args: Vec<String>,
}

impl CommandReporter {
    /// Parse a command line like `sendmail -t`.
    pub fn parse(command_line: &str) -> Result<Self> {
        let mut parts = command_line.split_whitespace().map(String::from);
        let program = parts.next().ok_or_else(|| Error::InvalidConfig {
            message: "report.command must not be empty".into(),
        })?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

/// Build an RFC 5322 style message with To and Subject headers.
pub fn email_message(config: &ReportConfig, summary: &BatchSummary) -> String {
    format!(
        "To: {}\nSubject: {}\nContent-Type: text/plain; charset=utf-8\n\n{}",
        config.recipients.join(", "),
        subject_line(summary),
        render_markdown(summary)
    )
}

#[async_trait]
impl Reporter for CommandReporter {
    async fn report(&self, config: &ReportConfig, summary: &BatchSummary) -> Result<()> {
        let message = email_message(config, summary);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Report {
                message: format!("failed to start {}: {}", self.program, e),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A command that exits early closes the pipe; its exit status
            // below is the better error
            if let Err(e) = stdin.write_all(message.as_bytes()).await {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
            }
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(Error::Report {
                message: format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status.code().unwrap_or(-1),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        tracing::info!(
            command = %self.program,
            recipients = %config.recipients.join(", "),
            "Sent report"
        );
        Ok(())
    }
}
