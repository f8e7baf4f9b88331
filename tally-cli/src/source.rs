use anyhow::{Context, Result};
use std::path::Path;
use tally_core::{Calendar, TimeWindow};
use tally_ingest::{FetchError, FetchedBatch, ReplaySource, SalesClient, TransactionSource};

use crate::config::Config;

/// Where sales come from: the live API, or a saved response file.
#[derive(Debug, Clone)]
pub enum Source {
    Api(SalesClient),
    Replay(ReplaySource),
}

impl Source {
    pub fn from_config(cfg: &Config, input: Option<&Path>) -> Result<Self> {
        let unit = cfg.api.epoch_unit;
        match input {
            Some(path) => {
                let replay = ReplaySource::from_path(path)
                    .with_context(|| format!("load {}", path.display()))?;
                Ok(Source::Replay(replay.with_epoch_unit(unit)))
            }
            None => {
                let client = SalesClient::new(&cfg.api.base_url, cfg.api.timeout())
                    .context("build HTTP client")?;
                Ok(Source::Api(client.with_epoch_unit(unit)))
            }
        }
    }
}

impl TransactionSource for Source {
    async fn fetch(
        &self,
        window: &TimeWindow,
        calendar: &Calendar,
        view: &str,
    ) -> Result<FetchedBatch, FetchError> {
        match self {
            Source::Api(client) => client.fetch(window, calendar, view).await,
            Source::Replay(replay) => replay.fetch(window, calendar, view).await,
        }
    }
}
