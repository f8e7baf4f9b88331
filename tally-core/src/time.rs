//! Time utilities: epoch normalization, the reference calendar and day-bounded windows.

use anyhow::Result;
use chrono::{
    DateTime, Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw epoch values strictly above this are read as seconds, everything else as
/// milliseconds.
///
/// A millisecond value for any date after late January 1970 also exceeds it and
/// ends up scaled twice. Such instants land far in the future and fall outside
/// every window. Ingestion can avoid the guess with an explicit [`EpochUnit`].
pub const SECONDS_THRESHOLD: f64 = 1_700_000_000.0;

const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Unit of a raw epoch number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpochUnit {
    Seconds,
    Millis,
}

impl EpochUnit {
    /// Guess the unit from the magnitude of the value.
    pub fn infer(raw: f64) -> Self {
        if raw > SECONDS_THRESHOLD {
            EpochUnit::Seconds
        } else {
            EpochUnit::Millis
        }
    }

    fn to_millis(self, raw: f64) -> f64 {
        match self {
            EpochUnit::Seconds => raw * 1000.0,
            EpochUnit::Millis => raw,
        }
    }
}

/// Resolve an epoch number of unknown unit to an instant.
///
/// Returns `None` when the value does not map to a representable instant.
pub fn normalize(raw: f64) -> Option<DateTime<Utc>> {
    normalize_with_unit(raw, EpochUnit::infer(raw))
}

/// Resolve an epoch number whose unit is known.
pub fn normalize_with_unit(raw: f64, unit: EpochUnit) -> Option<DateTime<Utc>> {
    let millis = unit.to_millis(raw);
    if !millis.is_finite() {
        return None;
    }
    // `as` saturates; saturated values are rejected by chrono below.
    DateTime::from_timestamp_millis(millis.round() as i64)
}

/// The single time zone used to turn instants into dates and hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    tz: Tz,
}

impl Default for Calendar {
    fn default() -> Self {
        Self { tz: Tz::UTC }
    }
}

impl Calendar {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Build a calendar from an IANA name like "America/Sao_Paulo".
    pub fn from_name(name: &str) -> Result<Self> {
        let tz: Tz = name
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid timezone: {name}"))?;
        Ok(Self { tz })
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// Wall-clock time of `instant` in this calendar.
    pub fn local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.tz).naive_local()
    }

    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.local(instant).date()
    }

    pub fn now(&self) -> NaiveDateTime {
        self.local(Utc::now())
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// First instant of `date` in this calendar.
    ///
    /// When midnight falls in a DST gap the day starts at the first wall-clock
    /// hour that exists.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        (0..24)
            .find_map(|h| {
                self.tz
                    .from_local_datetime(&(midnight + TimeDelta::hours(h)))
                    .earliest()
            })
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| midnight.and_utc())
    }

    /// Last millisecond of `date` in this calendar.
    pub fn end_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let next = match date.succ_opt() {
            Some(next) => self.start_of_day(next),
            None => self.start_of_day(date) + TimeDelta::days(1),
        };
        next - TimeDelta::milliseconds(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("window start {start} is after its end {end}")]
    Reversed { start: NaiveDate, end: NaiveDate },
}

/// Inclusive range of calendar days. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl TimeWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, WindowError> {
        if start > end {
            return Err(WindowError::Reversed { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    /// `end` and the `days_back` days before it.
    pub fn trailing(end: NaiveDate, days_back: u32) -> Self {
        let start = end
            .checked_sub_signed(TimeDelta::days(days_back.into()))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    /// The calendar month containing `date`.
    pub fn month_of(date: NaiveDate) -> Self {
        let start = first_of_month(date);
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX);
        Self { start, end }
    }

    /// The calendar year containing `date`.
    pub fn year_of(date: NaiveDate) -> Self {
        let start = date - TimeDelta::days(date.ordinal0().into());
        let end = start
            .checked_add_months(Months::new(12))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX);
        Self { start, end }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days in the window, both ends included.
    pub fn day_count(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    /// First and last instant of the window's days in `calendar`, as UTC.
    ///
    /// Covers exactly the instants whose calendar date is inside the window.
    pub fn request_bounds(&self, calendar: &Calendar) -> (DateTime<Utc>, DateTime<Utc>) {
        (calendar.start_of_day(self.start), calendar.end_of_day(self.end))
    }
}

pub(crate) fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - TimeDelta::days(date.day0().into())
}

/// Whole days from the midnight starting `period_start` up to `now`, rounded up.
///
/// Not clamped: `now` before the period gives zero or less, `now` after it
/// gives more than the period length.
pub fn elapsed_days(period_start: NaiveDate, now: NaiveDateTime) -> i64 {
    let since = now - period_start.and_time(NaiveTime::MIN);
    ceil_days(since)
}

fn ceil_days(delta: TimeDelta) -> i64 {
    let millis = delta.num_milliseconds();
    let whole = millis.div_euclid(DAY_MILLIS);
    if millis.rem_euclid(DAY_MILLIS) > 0 {
        whole + 1
    } else {
        whole
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_threshold_boundary() {
        // Just above: seconds, scaled by 1000.
        let above = normalize(1_700_000_001.0).unwrap();
        assert_eq!(above.timestamp_millis(), 1_700_000_001_000);
        assert_eq!(above.date_naive(), date(2023, 11, 14));

        // Just below: already milliseconds, left alone (lands in January 1970).
        let below = normalize(1_699_999_999.0).unwrap();
        assert_eq!(below.timestamp_millis(), 1_699_999_999);
        assert_eq!(below.date_naive(), date(1970, 1, 20));

        // The threshold itself is not "above".
        assert_eq!(EpochUnit::infer(SECONDS_THRESHOLD), EpochUnit::Millis);
    }

    #[test]
    fn test_recent_millis_are_scaled_twice() {
        // 2025-01-01T00:00:00Z in millis is read as seconds.
        let raw = 1_735_689_600_000.0;
        assert_eq!(EpochUnit::infer(raw), EpochUnit::Seconds);
        let dt = normalize(raw).unwrap();
        assert!(dt.year() > 50_000);
    }

    #[test]
    fn test_explicit_unit_skips_heuristic() {
        let dt = normalize_with_unit(1_735_689_600_000.0, EpochUnit::Millis).unwrap();
        assert_eq!(dt.date_naive(), date(2025, 1, 1));
    }

    #[test]
    fn test_non_finite_is_unmapped() {
        assert!(normalize(f64::NAN).is_none());
        assert!(normalize(f64::INFINITY).is_none());
        assert!(normalize(1e300).is_none());
    }

    #[test]
    fn test_calendar_uses_its_timezone() {
        let cal = Calendar::from_name("America/Sao_Paulo").unwrap();
        // 2025-01-02T01:30:00Z is still Jan 1st (UTC-3) in São Paulo.
        let instant = normalize(1_735_781_400.0).unwrap();
        let local = cal.local(instant);
        assert_eq!(local.date(), date(2025, 1, 1));
        assert_eq!(local.hour(), 22);

        assert_eq!(Calendar::default().date_of(instant), date(2025, 1, 2));
        assert!(Calendar::from_name("Mars/Olympus").is_err());
    }

    #[test]
    fn test_reversed_window_rejected() {
        let err = TimeWindow::new(date(2025, 1, 3), date(2025, 1, 1)).unwrap_err();
        assert_eq!(
            err,
            WindowError::Reversed {
                start: date(2025, 1, 3),
                end: date(2025, 1, 1)
            }
        );
    }

    #[test]
    fn test_month_and_year_windows() {
        let feb = TimeWindow::month_of(date(2024, 2, 17));
        assert_eq!(feb.start(), date(2024, 2, 1));
        assert_eq!(feb.end(), date(2024, 2, 29));
        assert_eq!(feb.day_count(), 29);

        let year = TimeWindow::year_of(date(2025, 7, 4));
        assert_eq!(year.start(), date(2025, 1, 1));
        assert_eq!(year.end(), date(2025, 12, 31));
        assert_eq!(year.day_count(), 365);
    }

    #[test]
    fn test_trailing_window_includes_both_ends() {
        let w = TimeWindow::trailing(date(2025, 1, 20), 7);
        assert_eq!(w.start(), date(2025, 1, 13));
        assert_eq!(w.days().count(), 8);
    }

    #[test]
    fn test_request_bounds_cover_whole_days() {
        let w = TimeWindow::new(date(2025, 1, 1), date(2025, 1, 31)).unwrap();
        let (start, end) = w.request_bounds(&Calendar::default());
        assert_eq!(
            start.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "2025-01-01T00:00:00.000Z"
        );
        assert_eq!(
            end.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "2025-01-31T23:59:59.999Z"
        );
    }

    #[test]
    fn test_request_bounds_follow_the_calendar() {
        let sp = Calendar::from_name("America/Sao_Paulo").unwrap();
        let june = TimeWindow::month_of(date(2025, 6, 1));
        let (start, end) = june.request_bounds(&sp);
        assert_eq!(
            start.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "2025-06-01T03:00:00.000Z"
        );
        assert_eq!(
            end.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "2025-07-01T02:59:59.999Z"
        );

        // 2025-06-30 22:00 in Sao Paulo: bucketed into June, so it must be requested too.
        let late = DateTime::from_timestamp(1_751_331_600, 0).unwrap();
        assert!(june.contains(sp.date_of(late)));
        assert!(start <= late && late <= end);

        // 2025-06-01 01:00 UTC is still May 31st locally.
        let early = DateTime::from_timestamp(1_748_739_600, 0).unwrap();
        assert!(!june.contains(sp.date_of(early)));
        assert!(early < start);
    }

    #[test]
    fn test_day_starting_in_a_dst_gap() {
        // Sao Paulo skipped 2018-11-04 00:00..01:00 local.
        let sp = Calendar::from_name("America/Sao_Paulo").unwrap();
        let start = sp.start_of_day(date(2018, 11, 4));
        assert_eq!(
            start.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            "2018-11-04T03:00:00Z"
        );
        assert_eq!(sp.date_of(start), date(2018, 11, 4));
        assert_eq!(sp.date_of(start - TimeDelta::seconds(1)), date(2018, 11, 3));
        assert_eq!(
            sp.end_of_day(date(2018, 11, 3)),
            start - TimeDelta::milliseconds(1)
        );
    }

    #[test]
    fn test_elapsed_days_rounds_up() {
        let start = date(2025, 6, 1);
        assert_eq!(elapsed_days(start, start.and_hms_opt(0, 0, 0).unwrap()), 0);
        assert_eq!(elapsed_days(start, start.and_hms_opt(0, 0, 1).unwrap()), 1);
        assert_eq!(
            elapsed_days(start, date(2025, 6, 15).and_hms_opt(9, 30, 0).unwrap()),
            15
        );
        // Past the period: not clamped.
        assert_eq!(
            elapsed_days(start, date(2025, 7, 2).and_hms_opt(12, 0, 0).unwrap()),
            32
        );
        // Before the period.
        assert_eq!(
            elapsed_days(start, date(2025, 5, 30).and_hms_opt(12, 0, 0).unwrap()),
            -1
        );
    }
}
