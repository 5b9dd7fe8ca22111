//! Reports written to a directory

use std::path::PathBuf;

use async_trait::async_trait;

use super::Reporter;
use super::render::{render_json, render_markdown};
use crate::config::ReportConfig;
use crate::outcome::BatchSummary;
use crate::Result;

/// Writes `<account>-<timestamp>.md` and `.json` into a directory.
#[derive(Debug, Clone)]
pub struct FileReporter {
    dir: PathBuf,
}

impl FileReporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn stem(summary: &BatchSummary) -> String {
        let stamp = summary
            .finished_at()
            .unwrap_or_else(|| summary.started_at())
            .format("%Y%m%dT%H%M%SZ");
        let account: String = summary
            .account()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
            .collect();
        format!("{account}-{stamp}")
    }
}

#[async_trait]
impl Reporter for FileReporter {
    async fn report(&self, _config: &ReportConfig, summary: &BatchSummary) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let stem = Self::stem(summary);
        let markdown = self.dir.join(format!("{stem}.md"));
        let json = self.dir.join(format!("{stem}.json"));

        tokio::fs::write(&markdown, render_markdown(summary)).await?;
        tokio::fs::write(&json, render_json(summary)?).await?;

        tracing::info!(path = %markdown.display(), "Wrote report");
        Ok(())
    }
}
