//! Batch reporting
//!
//! A [`Reporter`] receives the finished [`BatchSummary`] of an account. Report
//! failures are logged by the orchestrator and never change a batch verdict.

mod command;
mod file;
mod render;

use async_trait::async_trait;

use crate::Result;
use crate::config::ReportConfig;
use crate::outcome::BatchSummary;

pub use command::CommandReporter;
pub use file::FileReporter;
pub use render::{render_json, render_markdown, subject_line};

/// Delivers a batch summary somewhere.
#[async_trait]
pub trait Reporter: Send + Sync {
    async fn report(&self, config: &ReportConfig, summary: &BatchSummary) -> Result<()>;
}

/// Fans a summary out to several reporters.
///
/// Every reporter is tried; the first error is returned afterwards.
#[derive(Default)]
pub struct MultiReporter {
    reporters: Vec<Box<dyn Reporter>>,
}

impl MultiReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

#[async_trait]
impl Reporter for MultiReporter {
    async fn report(&self, config: &ReportConfig, summary: &BatchSummary) -> Result<()> {
        let mut first_error = None;
        for reporter in &self.reporters {
            if let Err(e) = reporter.report(config, summary).await {
                tracing::warn!(account = summary.account(), error = %e, "Reporter failed");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
