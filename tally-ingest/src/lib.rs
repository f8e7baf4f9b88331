//! tally-ingest: wire model of the transactions API and the sources that speak it.

pub mod client;
pub mod types;

pub use client::{FetchError, ReplaySource, SalesClient, TransactionSource, DEFAULT_TIMEOUT};
pub use types::{FetchedBatch, RawTransaction, ServerTotals, TransactionsRequest, TransactionsResponse};
