//! Transaction sources: the sales API over HTTP, and a saved response on disk.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use tally_core::{Calendar, EpochUnit, TimeWindow};
use thiserror::Error;

use crate::types::{FetchedBatch, TransactionsRequest, TransactionsResponse};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const TRANSACTIONS_PATH: &str = "/api/transactions";
const DEBUG_HEADER: &str = "X-Debug-Request";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server answered {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("could not decode transactions: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Anything that can hand over the sales of a window.
///
/// The window's days are read in `calendar`. `view` names the caller; the
/// HTTP source forwards it as a debug header.
pub trait TransactionSource {
    fn fetch(
        &self,
        window: &TimeWindow,
        calendar: &Calendar,
        view: &str,
    ) -> impl Future<Output = Result<FetchedBatch, FetchError>> + Send;
}

#[derive(Debug, Clone)]
pub struct SalesClient {
    http: reqwest::Client,
    endpoint: String,
    epoch_unit: Option<EpochUnit>,
}

impl SalesClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), TRANSACTIONS_PATH),
            epoch_unit: None,
        })
    }

    /// Declare the unit of `created_at` instead of letting it be guessed.
    pub fn with_epoch_unit(mut self, unit: Option<EpochUnit>) -> Self {
        self.epoch_unit = unit;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl TransactionSource for SalesClient {
    async fn fetch(
        &self,
        window: &TimeWindow,
        calendar: &Calendar,
        view: &str,
    ) -> Result<FetchedBatch, FetchError> {
        let body = TransactionsRequest::for_window(window, calendar);
        tracing::debug!(
            endpoint = %self.endpoint,
            view,
            start = %body.ordered_at_ini,
            end = %body.ordered_at_end,
            "fetching transactions"
        );

        let resp = self
            .http
            .post(&self.endpoint)
            .header(DEBUG_HEADER, view)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let bytes = resp.bytes().await?;
        let parsed: TransactionsResponse = serde_json::from_slice(&bytes)?;
        let batch = parsed.into_batch(self.epoch_unit);
        if batch.dropped > 0 {
            tracing::warn!(dropped = batch.dropped, view, "rows without created_at ignored");
        }
        Ok(batch)
    }
}

/// Replays a saved API response, whatever window is asked for.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    response: TransactionsResponse,
    epoch_unit: Option<EpochUnit>,
}

impl ReplaySource {
    pub fn from_json(json: &str) -> Result<Self, FetchError> {
        Ok(Self {
            response: serde_json::from_str(json)?,
            epoch_unit: None,
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FetchError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| FetchError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn with_epoch_unit(mut self, unit: Option<EpochUnit>) -> Self {
        self.epoch_unit = unit;
        self
    }
}

impl TransactionSource for ReplaySource {
    async fn fetch(
        &self,
        _window: &TimeWindow,
        _calendar: &Calendar,
        _view: &str,
    ) -> Result<FetchedBatch, FetchError> {
        Ok(self.response.clone().into_batch(self.epoch_unit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = SalesClient::new("http://localhost:3000/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:3000/api/transactions");
    }

    #[tokio::test]
    async fn test_replay_source_returns_saved_rows() {
        let source = ReplaySource::from_json(
            r#"{"data": [{"dates": {"created_at": 1735732800}, "calculation_details": {"net_amount": 10}}]}"#,
        )
        .unwrap();
        let window = TimeWindow::single_day(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        let batch = source.fetch(&window, &Calendar::default(), "test").await.unwrap();
        assert_eq!(batch.transactions.len(), 1);
        assert_eq!(batch.transactions[0].net_amount, Some(10.0));
    }

    #[test]
    fn test_replay_source_reports_bad_json() {
        let err = ReplaySource::from_json("{not json").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));

        let err = ReplaySource::from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_transport_error() {
        // Port 9 (discard) on localhost is closed in any sane test environment.
        let client = SalesClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let window = TimeWindow::single_day(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        let err = client.fetch(&window, &Calendar::default(), "test").await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
