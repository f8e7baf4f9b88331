//! Bucket aggregation: fold transactions into a dense, ordered time grid.
//!
//! The grid for a (window, granularity) pair is built up front with every key
//! zeroed, so days or hours without sales still show up. A transaction lands
//! in a bucket only if its calendar date is inside the window; anything else is
//! left out of every bucket and therefore out of every total derived from them.

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::currency::Money;
use crate::time::{first_of_month, Calendar, TimeWindow};
use crate::transaction::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Hour of day, 0..=23, summed over every day of the window
    Hour,
    Day,
    Month,
}

/// Identity of a bucket. Ordering is chronological within one granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BucketKey {
    Hour(u32),
    Day(NaiveDate),
    Month { year: i32, month: u32 },
}

impl BucketKey {
    fn derive(granularity: Granularity, local: NaiveDateTime) -> Self {
        match granularity {
            Granularity::Hour => BucketKey::Hour(local.hour()),
            Granularity::Day => BucketKey::Day(local.date()),
            Granularity::Month => BucketKey::Month {
                year: local.year(),
                month: local.month(),
            },
        }
    }
}

/// `"13"` for hours, `"2025-01-31"` for days, `"01"` for months.
impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketKey::Hour(h) => write!(f, "{h}"),
            BucketKey::Day(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            BucketKey::Month { month, .. } => write!(f, "{month:02}"),
        }
    }
}

impl Serialize for BucketKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub key: BucketKey,
    pub net_amount: Money,
    pub count: u64,
    pub affiliate_amount: Money,
}

impl Bucket {
    pub fn empty(key: BucketKey) -> Self {
        Self {
            key,
            net_amount: Money::ZERO,
            count: 0,
            affiliate_amount: Money::ZERO,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0 && self.net_amount.is_zero() && self.affiliate_amount.is_zero()
    }

    fn add(&mut self, tx: &Transaction) {
        self.net_amount += tx.net();
        self.count += 1;
        self.affiliate_amount += tx.affiliate();
    }
}

/// Every key of the grid, in order.
pub fn grid_keys(window: &TimeWindow, granularity: Granularity) -> Vec<BucketKey> {
    match granularity {
        Granularity::Hour => (0..24).map(BucketKey::Hour).collect(),
        Granularity::Day => window.days().map(BucketKey::Day).collect(),
        Granularity::Month => {
            let mut keys = Vec::new();
            let mut cursor = Some(first_of_month(window.start()));
            while let Some(month) = cursor.filter(|m| *m <= window.end()) {
                keys.push(BucketKey::Month {
                    year: month.year(),
                    month: month.month(),
                });
                cursor = month.checked_add_months(Months::new(1));
            }
            keys
        }
    }
}

/// Where a transaction falls in `calendar`, if it falls inside `window` at all.
pub fn place(
    tx: &Transaction,
    window: &TimeWindow,
    calendar: &Calendar,
) -> Option<NaiveDateTime> {
    let local = calendar.local(tx.instant()?);
    window.contains(local.date()).then_some(local)
}

/// Fold `transactions` into the dense grid for `window` at `granularity`.
///
/// Never fails: unusable timestamps and out-of-window sales are skipped, and an
/// empty slice gives the all-zero grid.
pub fn aggregate(
    transactions: &[Transaction],
    window: &TimeWindow,
    granularity: Granularity,
    calendar: &Calendar,
) -> Vec<Bucket> {
    let mut grid: BTreeMap<BucketKey, Bucket> = grid_keys(window, granularity)
        .into_iter()
        .map(|key| (key, Bucket::empty(key)))
        .collect();

    let mut skipped = 0usize;
    for tx in transactions {
        let bucket = place(tx, window, calendar)
            .and_then(|local| grid.get_mut(&BucketKey::derive(granularity, local)));
        match bucket {
            Some(bucket) => bucket.add(tx),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::debug!(
            skipped,
            total = transactions.len(),
            start = %window.start(),
            end = %window.end(),
            "transactions outside the window left out of the buckets"
        );
    }

    grid.into_values().collect()
}
