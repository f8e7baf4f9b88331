//! Generation guard for overlapping refreshes.
//!
//! Every fetch takes a [`Ticket`] when it starts. A result is applied only if
//! its ticket is still the newest one handed out, so the latest request to
//! start wins no matter which one resolves last. Retiring the guard (view torn
//! down) invalidates every outstanding ticket for good.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct RefreshGuard {
    generation: AtomicU64,
    retired: AtomicBool,
}

impl RefreshGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation; older tickets stop being current.
    pub fn begin(&self) -> Ticket {
        Ticket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        !self.is_retired() && self.generation.load(Ordering::SeqCst) == ticket.0
    }

    pub fn retire(&self) {
        self.retired.store(true, Ordering::SeqCst);
    }

    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::SeqCst)
    }
}
