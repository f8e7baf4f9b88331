//! Last known good report plus a non-fatal error flag.

use std::fmt::Display;
use tally_core::{RefreshGuard, Ticket};

/// What happened to a finished fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Updated,
    /// The fetch failed; the previous value stays on display.
    Failed,
    /// A newer fetch started, or the view is gone: nothing was written.
    Discarded,
}

#[derive(Debug)]
pub struct ReportState<T> {
    latest: Option<T>,
    last_error: Option<String>,
    loading: bool,
}

impl<T> Default for ReportState<T> {
    fn default() -> Self {
        Self {
            latest: None,
            last_error: None,
            loading: false,
        }
    }
}

impl<T> ReportState<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<&T> {
        self.latest.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Mark a fetch as started and hand back its ticket.
    pub fn start(&mut self, guard: &RefreshGuard) -> Ticket {
        self.loading = true;
        guard.begin()
    }

    /// Record the outcome of the fetch holding `ticket`, unless it is stale.
    pub fn finish<E: Display>(
        &mut self,
        guard: &RefreshGuard,
        ticket: Ticket,
        outcome: Result<T, E>,
    ) -> Applied {
        if !guard.is_current(ticket) {
            tracing::debug!(generation = ticket.generation(), "stale refresh discarded");
            return Applied::Discarded;
        }

        self.loading = false;
        match outcome {
            Ok(value) => {
                self.latest = Some(value);
                self.last_error = None;
                Applied::Updated
            }
            Err(err) => {
                tracing::warn!(error = %err, "refresh failed; keeping the last good report");
                self.last_error = Some(err.to_string());
                Applied::Failed
            }
        }
    }
}
