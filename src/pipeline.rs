//! The freshness-gated fetch → extract → filter → persist run.

use chrono::{Local, NaiveDate};
use tracing::info;

use crate::cache::should_refetch_on;
use crate::config::FeedConfig;
use crate::error::PipelineError;
use crate::extract::extract;
use crate::fetch::{HttpClient, fetch_archive};
use crate::filter::filter_rows;
use crate::persist::persist;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The output file was already written today and was left as is.
    Fresh,
    /// The feed was downloaded and `rows` stop times were saved.
    Updated { rows: usize },
}

pub struct Pipeline<C> {
    config: FeedConfig,
    client: C,
}

impl<C: HttpClient> Pipeline<C> {
    pub fn new(config: FeedConfig, client: C) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn run(&self) -> Result<RunOutcome, PipelineError> {
        self.run_on(Local::now().date_naive())
    }

    /// Runs the pipeline as if the local date were `today`.
    ///
    /// Any failure aborts the run before the output file is opened for
    /// writing, except a write failure itself.
    #[tracing::instrument(skip(self), fields(url = %self.config.url))]
    pub fn run_on(&self, today: NaiveDate) -> Result<RunOutcome, PipelineError> {
        let path = self.config.output_path();
        if !should_refetch_on(&path, today) {
            return Ok(RunOutcome::Fresh);
        }

        let bytes = fetch_archive(&self.client, &self.config.url)?;
        let rows = extract(&bytes, &self.config.member)?;
        info!(member = %self.config.member, "Archive extracted");

        let kept = filter_rows(rows, &self.config.criteria())?;
        persist(&kept, &path, self.config.format)?;

        Ok(RunOutcome::Updated { rows: kept.len() })
    }
}
