//! Grand totals and running (cumulative) series.

use serde::Serialize;

use crate::buckets::{place, Bucket, BucketKey};
use crate::currency::Money;
use crate::time::{Calendar, TimeWindow};
use crate::transaction::Transaction;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub net_amount: Money,
    pub count: u64,
    pub affiliate_amount: Money,
}

impl Totals {
    /// Sum every field across the grid.
    pub fn from_buckets(buckets: &[Bucket]) -> Self {
        buckets.iter().fold(Self::default(), |acc, b| Self {
            net_amount: acc.net_amount + b.net_amount,
            count: acc.count + b.count,
            affiliate_amount: acc.affiliate_amount + b.affiliate_amount,
        })
    }

    /// Sum the transactions directly, keeping only those inside `window`.
    /// Agrees with [`Totals::from_buckets`] over the same window.
    pub fn from_transactions(
        transactions: &[Transaction],
        window: &TimeWindow,
        calendar: &Calendar,
    ) -> Self {
        transactions
            .iter()
            .filter(|tx| place(tx, window, calendar).is_some())
            .fold(Self::default(), |acc, tx| Self {
                net_amount: acc.net_amount + tx.net(),
                count: acc.count + 1,
                affiliate_amount: acc.affiliate_amount + tx.affiliate(),
            })
    }

    /// Net amount per sale; zero when there are no sales.
    pub fn average_ticket(&self) -> Money {
        self.net_amount.per(self.count)
    }
}

/// Totals accumulated up to and including one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunningPoint {
    pub key: BucketKey,
    pub net_amount: Money,
    pub count: u64,
    pub affiliate_amount: Money,
}

pub fn running_totals(buckets: &[Bucket]) -> Vec<RunningPoint> {
    buckets
        .iter()
        .scan(Totals::default(), |acc, b| {
            acc.net_amount += b.net_amount;
            acc.count += b.count;
            acc.affiliate_amount += b.affiliate_amount;
            Some(RunningPoint {
                key: b.key,
                net_amount: acc.net_amount,
                count: acc.count,
                affiliate_amount: acc.affiliate_amount,
            })
        })
        .collect()
}
