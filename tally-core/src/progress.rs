//! Goal progress: how far the running total is from where the calendar says it
//! should be.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::currency::Money;
use crate::time::{elapsed_days, TimeWindow};

/// Which side of the expected pace an amount is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Schedule {
    Ahead,
    Behind,
}

/// Percentages are on a 0..100 scale but not clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GoalProgress {
    pub expected_pct: f64,
    pub actual_pct: f64,
    pub deviation_pct: f64,
}

impl GoalProgress {
    /// A deviation of zero counts as ahead.
    pub fn schedule(&self) -> Schedule {
        if self.deviation_pct >= 0.0 {
            Schedule::Ahead
        } else {
            Schedule::Behind
        }
    }

    /// Width of a progress bar, capped to 0..=100.
    pub fn bar_fill_pct(&self) -> f64 {
        self.actual_pct.clamp(0.0, 100.0)
    }

    /// `"+10.00% ahead of schedule"` / `"-3.25% behind schedule"`.
    pub fn deviation_label(&self) -> String {
        match self.schedule() {
            Schedule::Ahead => format!("+{:.2}% ahead of schedule", self.deviation_pct.abs()),
            Schedule::Behind => format!("-{:.2}% behind schedule", self.deviation_pct.abs()),
        }
    }
}

/// Compare `current` against `target` for `period`, as of `now`.
///
/// Both day counts are whole days rounded up from the period's first midnight,
/// so the first day of the period counts once any time has passed.
/// A zero target has zero actual progress.
pub fn progress(
    current: Money,
    target: Money,
    period: &TimeWindow,
    now: NaiveDateTime,
) -> GoalProgress {
    let total_days = period.day_count();
    let elapsed = elapsed_days(period.start(), now);

    let expected_pct = 100.0 * elapsed as f64 / total_days as f64;
    let actual_pct = if target.minor() > 0 {
        100.0 * current.minor() as f64 / target.minor() as f64
    } else {
        0.0
    };

    GoalProgress {
        expected_pct,
        actual_pct,
        deviation_pct: actual_pct - expected_pct,
    }
}
