use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use tally_core::{RefreshGuard, Ticket};
use tally_ingest::{FetchError, TransactionSource};
use tally_report::{Applied, Report, ReportContext, ReportState, View};

type Finished = (Ticket, Result<Report, FetchError>);

/// Refresh `view` every `every` until `shutdown` resolves.
///
/// Each tick starts a fetch for the view's default window as of that tick.
/// A fetch still running when the next tick fires is cancelled, and its
/// ticket is superseded anyway. `on_update` sees the state after every
/// applied or failed fetch. Once `shutdown` resolves the guard is retired and
/// nothing else is written.
pub async fn watch<S, F>(
    source: Arc<S>,
    ctx: Arc<ReportContext>,
    view: View,
    every: Duration,
    mut on_update: F,
    shutdown: impl Future<Output = ()>,
) -> ReportState<Report>
where
    S: TransactionSource + Send + Sync + 'static,
    F: FnMut(&ReportState<Report>, Applied),
{
    let guard = RefreshGuard::new();
    let mut state = ReportState::new();
    let (tx, mut rx) = mpsc::unbounded_channel::<Finished>();
    let mut in_flight: Option<tokio::task::JoinHandle<()>> = None;

    let mut timer = tokio::time::interval(every);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                guard.retire();
                if let Some(h) = in_flight.take() {
                    h.abort();
                }
                tracing::info!(view = view.request_name(), "watch stopped");
                break;
            }
            _ = timer.tick() => {
                if let Some(h) = in_flight.take() {
                    h.abort();
                }
                let window = view.default_window(ctx.calendar.today());
                let ticket = state.start(&guard);
                tracing::info!(
                    view = view.request_name(),
                    generation = ticket.generation(),
                    start = %window.start(),
                    end = %window.end(),
                    "refresh"
                );

                let (source, ctx, tx) = (source.clone(), ctx.clone(), tx.clone());
                in_flight = Some(tokio::spawn(async move {
                    let outcome = ctx.fetch(&*source, view, window).await;
                    let _ = tx.send((ticket, outcome));
                }));
            }
            Some((ticket, outcome)) = rx.recv() => {
                let applied = state.finish(&guard, ticket, outcome);
                if applied != Applied::Discarded {
                    on_update(&state, applied);
                }
            }
        }
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::Calendar;
    use tally_ingest::ReplaySource;
    use tokio::sync::oneshot;

    fn replay(json: &str) -> Arc<ReplaySource> {
        Arc::new(ReplaySource::from_json(json).unwrap())
    }

    #[tokio::test]
    async fn test_first_tick_produces_a_report() {
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let mut stop_tx = Some(stop_tx);
        let mut seen = Vec::new();

        let state = watch(
            replay(r#"{"data": [], "totals": {"total_transactions": 0}}"#),
            Arc::new(ReportContext::new(Calendar::default())),
            View::Today,
            Duration::from_secs(3600),
            |_, applied| {
                seen.push(applied);
                if let Some(tx) = stop_tx.take() {
                    let _ = tx.send(());
                }
            },
            async {
                let _ = stop_rx.await;
            },
        )
        .await;

        assert_eq!(seen, vec![Applied::Updated]);
        let report = state.latest().unwrap();
        assert_eq!(report.view, View::Today);
        assert_eq!(report.buckets.len(), 24);
        assert_eq!(report.totals.count, 0);
        assert!(state.last_error().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_before_any_fetch_leaves_state_empty() {
        let state = watch(
            replay(r#"{"data": []}"#),
            Arc::new(ReportContext::default()),
            View::Monthly,
            Duration::from_secs(3600),
            |_, _| panic!("nothing should be applied"),
            async {},
        )
        .await;
        assert!(state.latest().is_none());
    }
}
