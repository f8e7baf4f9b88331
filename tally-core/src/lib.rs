//! tally-core: the sales aggregation engine.
//!
//! Timestamp normalization, the BRL currency codec, bucket aggregation,
//! totals, goal progress and the refresh guard. Everything here is pure and
//! synchronous; fetching and presentation live in the other crates.

pub mod buckets;
pub mod currency;
pub mod goals;
pub mod progress;
pub mod refresh;
pub mod time;
pub mod totals;
pub mod transaction;

pub use buckets::{aggregate, grid_keys, place, Bucket, BucketKey, Granularity};
pub use currency::{format, format_keystrokes, parse, parse_minor, Money};
pub use goals::{
    goal_key, GoalBoard, GoalStore, GoalTier, MemoryGoalStore, PeriodKind, TierProgress,
    DEFAULT_GOAL_DISPLAY,
};
pub use progress::{progress, GoalProgress, Schedule};
pub use refresh::{RefreshGuard, Ticket};
pub use time::{
    elapsed_days, normalize, normalize_with_unit, Calendar, EpochUnit, TimeWindow, WindowError,
    SECONDS_THRESHOLD,
};
pub use totals::{running_totals, RunningPoint, Totals};
pub use transaction::Transaction;
