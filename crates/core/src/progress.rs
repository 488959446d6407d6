//! Live counts for a run in flight.
//!
//! The transfer loop records into a [`RunProgress`] as each message settles,
//! so a caller that cuts the run off (deadline, shutdown) still knows what
//! the batch already did.

use std::sync::atomic::{AtomicUsize, Ordering};

use queuebridge_domain::{BridgeError, RunStatus, RunSummary, TransferOutcome};

#[derive(Debug, Default)]
pub struct RunProgress {
    fetched: AtomicUsize,
    transferred: AtomicUsize,
    failed: AtomicUsize,
    poison_candidates: AtomicUsize,
}

impl RunProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self, fetched: usize, poison_candidates: usize) {
        self.fetched.store(fetched, Ordering::SeqCst);
        self.poison_candidates.store(poison_candidates, Ordering::SeqCst);
    }

    pub fn record_outcome(&self, outcome: &TransferOutcome) {
        let counter = if outcome.is_transferred() { &self.transferred } else { &self.failed };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Summary for a run stopped before its batch settled.
    ///
    /// Messages still unsettled were not deleted, so they count as failed
    /// and `fetched == transferred + failed` keeps holding.
    pub fn aborted(&self, error: BridgeError) -> RunSummary {
        let fetched = self.fetched.load(Ordering::SeqCst);
        let transferred = self.transferred.load(Ordering::SeqCst).min(fetched);
        RunSummary {
            fetched,
            transferred,
            failed: fetched - transferred,
            poison_candidates: self.poison_candidates.load(Ordering::SeqCst),
            status: RunStatus::Aborted { error },
        }
    }
}
