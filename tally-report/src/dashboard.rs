//! The four dashboards: today by hour, a day range, the month and the year.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tally_core::{
    aggregate, running_totals, Bucket, Calendar, GoalBoard, Granularity, Money, PeriodKind,
    RunningPoint, TierProgress, TimeWindow, Totals,
};
use tally_ingest::{FetchError, FetchedBatch, ServerTotals, TransactionSource};

use crate::products::{product_breakdown, ProductSales};

/// Days before today shown by the default daily range.
pub const DAILY_LOOKBACK_DAYS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Today,
    Daily,
    Monthly,
    Yearly,
}

impl View {
    /// Name sent along with requests so the server can tell callers apart.
    pub fn request_name(&self) -> &'static str {
        match self {
            View::Today => "Today",
            View::Daily => "DailyDashboard",
            View::Monthly => "MonthlyDashboard",
            View::Yearly => "YearlyDashboard",
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            View::Today => Granularity::Hour,
            View::Daily | View::Monthly => Granularity::Day,
            View::Yearly => Granularity::Month,
        }
    }

    /// Period whose goals this view tracks.
    pub fn goal_period(&self) -> Option<PeriodKind> {
        match self {
            View::Monthly => Some(PeriodKind::Monthly),
            View::Yearly => Some(PeriodKind::Yearly),
            View::Today | View::Daily => None,
        }
    }

    pub fn default_window(&self, today: NaiveDate) -> TimeWindow {
        match self {
            View::Today => TimeWindow::single_day(today),
            View::Daily => TimeWindow::trailing(today, DAILY_LOOKBACK_DAYS),
            View::Monthly => TimeWindow::month_of(today),
            View::Yearly => TimeWindow::year_of(today),
        }
    }
}

/// Everything a dashboard shows for one fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub view: View,
    pub window: TimeWindow,
    pub buckets: Vec<Bucket>,
    pub running: Vec<RunningPoint>,
    pub totals: Totals,
    pub average_ticket: Money,
    /// Totals as sent by the server, kept for comparison only
    pub server_totals: Option<ServerTotals>,
    pub products: Vec<ProductSales>,
    pub goals: Vec<TierProgress>,
}

/// Whether server totals agree with the ones recomputed from the buckets.
/// `None` when the server sent no readable figure to compare.
pub fn reconcile(totals: &Totals, server: Option<&ServerTotals>) -> Option<bool> {
    let server = server?;
    if server.total_transactions.is_none() && server.total_net_amount.is_none() {
        return None;
    }
    let count_matches = server
        .total_transactions
        .is_none_or(|count| count == totals.count);
    let net_matches = server
        .total_net_amount
        .is_none_or(|net| Money::from_amount(net) == totals.net_amount);
    Some(count_matches && net_matches)
}

/// Calendar and goals shared by every report of a session.
#[derive(Debug, Clone, Default)]
pub struct ReportContext {
    pub calendar: Calendar,
    pub goals: Option<GoalBoard>,
}

impl ReportContext {
    pub fn new(calendar: Calendar) -> Self {
        Self {
            calendar,
            goals: None,
        }
    }

    pub fn with_goals(mut self, goals: GoalBoard) -> Self {
        self.goals = Some(goals);
        self
    }

    /// Turn one fetched batch into a report, as of `now` (calendar wall time).
    pub fn build(
        &self,
        view: View,
        window: TimeWindow,
        batch: &FetchedBatch,
        now: NaiveDateTime,
    ) -> Report {
        let buckets = aggregate(
            &batch.transactions,
            &window,
            view.granularity(),
            &self.calendar,
        );
        let totals = Totals::from_buckets(&buckets);

        if reconcile(&totals, batch.server_totals.as_ref()) == Some(false) {
            tracing::warn!(
                view = view.request_name(),
                count = totals.count,
                net = %totals.net_amount,
                server = ?batch.server_totals,
                "server totals differ from recomputed totals; using recomputed"
            );
        }

        let products = match view {
            View::Today => product_breakdown(&batch.transactions, &window, &self.calendar),
            _ => Vec::new(),
        };

        let goals = match (view.goal_period(), &self.goals) {
            (Some(period), Some(board)) if board.period() == period => {
                let period_window = period.window_containing(window.start());
                board.progress(totals.net_amount, &period_window, now)
            }
            _ => Vec::new(),
        };

        Report {
            view,
            window,
            running: running_totals(&buckets),
            average_ticket: totals.average_ticket(),
            buckets,
            totals,
            server_totals: batch.server_totals,
            products,
            goals,
        }
    }

    /// Fetch `window` from `source` and build the report as of now.
    pub async fn fetch<S: TransactionSource>(
        &self,
        source: &S,
        view: View,
        window: TimeWindow,
    ) -> Result<Report, FetchError> {
        let batch = source
            .fetch(&window, &self.calendar, view.request_name())
            .await?;
        Ok(self.build(view, window, &batch, self.calendar.now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tally_core::{GoalTier, MemoryGoalStore, Schedule, Transaction};
    use tally_ingest::TransactionsRequest;

    /// Records the request it would have sent and answers with `rows`.
    #[derive(Default)]
    struct RecordingSource {
        rows: Vec<Transaction>,
        sent: Mutex<Option<TransactionsRequest>>,
    }

    impl TransactionSource for RecordingSource {
        async fn fetch(
            &self,
            window: &TimeWindow,
            calendar: &Calendar,
            _view: &str,
        ) -> Result<FetchedBatch, FetchError> {
            *self.sent.lock().unwrap() = Some(TransactionsRequest::for_window(window, calendar));
            Ok(FetchedBatch {
                transactions: self.rows.clone(),
                ..FetchedBatch::default()
            })
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn noon(day: NaiveDate) -> f64 {
        day.and_hms_opt(12, 0, 0).unwrap().and_utc().timestamp() as f64
    }

    fn batch(transactions: Vec<Transaction>, server_totals: Option<ServerTotals>) -> FetchedBatch {
        FetchedBatch {
            transactions,
            server_totals,
            dropped: 0,
        }
    }

    #[test]
    fn test_default_windows() {
        let today = date(2025, 1, 20);
        assert_eq!(View::Today.default_window(today), TimeWindow::single_day(today));
        assert_eq!(View::Daily.default_window(today).start(), date(2025, 1, 13));
        assert_eq!(View::Monthly.default_window(today).end(), date(2025, 1, 31));
        assert_eq!(View::Yearly.default_window(today).start(), date(2025, 1, 1));
    }

    #[test]
    fn test_daily_report_scenario() {
        let window = TimeWindow::new(date(2025, 1, 1), date(2025, 1, 3)).unwrap();
        let txns = vec![
            Transaction::new(noon(date(2025, 1, 1))).with_net_amount(100.0),
            Transaction::new(noon(date(2025, 1, 1))).with_net_amount(50.0),
            Transaction::new(noon(date(2025, 1, 3))).with_net_amount(200.0),
        ];
        let ctx = ReportContext::default();
        let report = ctx.build(
            View::Daily,
            window,
            &batch(txns, None),
            date(2025, 1, 3).and_hms_opt(13, 0, 0).unwrap(),
        );

        assert_eq!(report.buckets.len(), 3);
        assert_eq!(report.totals.count, 3);
        assert_eq!(report.totals.net_amount, Money::from_minor(35_000));
        assert_eq!(report.average_ticket, Money::from_minor(11_667));
        assert!(report.goals.is_empty());
        assert!(report.products.is_empty());
    }

    #[test]
    fn test_recomputed_totals_win_over_server() {
        let window = TimeWindow::single_day(date(2025, 1, 1));
        let txns = vec![
            Transaction::new(noon(date(2025, 1, 1))).with_net_amount(10.0),
            // Outside the window: the server counted it, the buckets don't.
            Transaction::new(noon(date(2025, 1, 2))).with_net_amount(5.0),
        ];
        let server = ServerTotals {
            total_transactions: Some(2),
            total_net_amount: Some(15.0),
        };
        let report = ReportContext::default().build(
            View::Daily,
            window,
            &batch(txns, Some(server)),
            date(2025, 1, 1).and_hms_opt(18, 0, 0).unwrap(),
        );

        assert_eq!(report.totals.count, 1);
        assert_eq!(report.totals.net_amount, Money::from_minor(1_000));
        assert_eq!(reconcile(&report.totals, report.server_totals.as_ref()), Some(false));
    }

    #[test]
    fn test_reconcile() {
        let totals = Totals {
            net_amount: Money::from_minor(1_050),
            count: 2,
            affiliate_amount: Money::ZERO,
        };
        assert_eq!(reconcile(&totals, None), None);
        let agree = ServerTotals {
            total_transactions: Some(2),
            total_net_amount: Some(10.5),
        };
        assert_eq!(reconcile(&totals, Some(&agree)), Some(true));
        let count_only = ServerTotals {
            total_transactions: Some(2),
            total_net_amount: None,
        };
        assert_eq!(reconcile(&totals, Some(&count_only)), Some(true));
        let net_only = ServerTotals {
            total_transactions: None,
            total_net_amount: Some(10.49),
        };
        assert_eq!(reconcile(&totals, Some(&net_only)), Some(false));
        assert_eq!(reconcile(&totals, Some(&ServerTotals::default())), None);
    }

    #[test]
    fn test_monthly_report_tracks_goals() {
        let mut store = MemoryGoalStore::new();
        let mut board = GoalBoard::load(&store, PeriodKind::Monthly).unwrap();
        board.edit(GoalTier::Meta, "100000");
        board.save(&mut store, GoalTier::Meta).unwrap();

        let june = TimeWindow::month_of(date(2025, 6, 1));
        let txns = vec![
            Transaction::new(noon(date(2025, 6, 2))).with_net_amount(400.0),
            Transaction::new(noon(date(2025, 6, 14))).with_net_amount(200.0),
        ];
        let ctx = ReportContext::default().with_goals(GoalBoard::load(&store, PeriodKind::Monthly).unwrap());
        let report = ctx.build(
            View::Monthly,
            june,
            &batch(txns, None),
            date(2025, 6, 15).and_hms_opt(10, 0, 0).unwrap(),
        );

        assert_eq!(report.buckets.len(), 30);
        assert_eq!(report.running[13].net_amount, Money::from_minor(60_000));
        assert_eq!(report.goals.len(), 3);
        let meta = &report.goals[0];
        assert_eq!(meta.progress.expected_pct, 50.0);
        assert_eq!(meta.progress.actual_pct, 60.0);
        assert_eq!(meta.progress.schedule(), Schedule::Ahead);
    }

    #[test]
    fn test_goals_of_another_period_are_ignored() {
        let board = GoalBoard::load(&MemoryGoalStore::new(), PeriodKind::Yearly).unwrap();
        let ctx = ReportContext::default().with_goals(board);
        let report = ctx.build(
            View::Monthly,
            TimeWindow::month_of(date(2025, 6, 1)),
            &FetchedBatch::default(),
            date(2025, 6, 15).and_hms_opt(10, 0, 0).unwrap(),
        );
        assert!(report.goals.is_empty());
        assert_eq!(report.buckets.len(), 30);
    }

    #[test]
    fn test_today_report_has_hours_and_products() {
        let day = date(2025, 1, 20);
        let txns = vec![
            Transaction::new(noon(day)).with_net_amount(97.0).with_product("Curso"),
            Transaction::new(noon(day) + 60.0).with_net_amount(3.0).with_product("Ebook"),
        ];
        let report = ReportContext::default().build(
            View::Today,
            TimeWindow::single_day(day),
            &batch(txns, None),
            day.and_hms_opt(15, 0, 0).unwrap(),
        );
        assert_eq!(report.buckets.len(), 24);
        assert_eq!(report.buckets[12].count, 2);
        assert_eq!(report.products.len(), 2);
        assert_eq!(report.products[0].name, "Curso");
    }

    #[tokio::test]
    async fn test_request_and_buckets_share_the_calendar() {
        let sp = Calendar::from_name("America/Sao_Paulo").unwrap();
        // 2025-06-30 22:00 local, 2025-07-01 01:00 UTC.
        let late_june = Transaction::new(1_751_331_600.0).with_net_amount(80.0);
        let source = RecordingSource {
            rows: vec![late_june],
            ..RecordingSource::default()
        };

        let june = TimeWindow::month_of(date(2025, 6, 1));
        let report = ReportContext::new(sp)
            .fetch(&source, View::Monthly, june)
            .await
            .unwrap();

        let sent = source.sent.lock().unwrap().clone().unwrap();
        assert_eq!(sent.ordered_at_ini, "2025-06-01T03:00:00.000Z");
        assert_eq!(sent.ordered_at_end, "2025-07-01T02:59:59.999Z");
        assert_eq!(report.buckets[29].net_amount, Money::from_minor(8_000));
        assert_eq!(report.totals.count, 1);
    }
}
