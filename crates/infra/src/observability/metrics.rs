//! Transfer metrics
//!
//! Process-lifetime counters for runs and messages. No locking needed; every
//! field is an atomic. Durations are stored in microseconds and reported in
//! milliseconds.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use queuebridge_domain::{FailureStage, RunStatus, RunSummary};
use serde::Serialize;

use crate::observability::{MetricsError, MetricsResult};

/// Counters fed by the run reporter and the scheduler.
#[derive(Debug, Default)]
pub struct TransferMetrics {
    runs_completed: AtomicUsize,
    runs_aborted: AtomicUsize,
    runs_disabled: AtomicUsize,
    runs_skipped: AtomicUsize,
    runs_timed_out: AtomicUsize,
    fetched: AtomicUsize,
    transferred: AtomicUsize,
    failed: AtomicUsize,
    send_failures: AtomicUsize,
    delete_failures: AtomicUsize,
    poison_candidates: AtomicUsize,
    /// Total time spent in runs in microseconds
    total_run_time_micros: AtomicU64,
    /// Number of run durations recorded
    timed_runs: AtomicUsize,
    last_run_time_micros: AtomicU64,
}

/// Point-in-time copy of [`TransferMetrics`], suitable for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransferMetricsSnapshot {
    pub runs_completed: usize,
    pub runs_aborted: usize,
    pub runs_disabled: usize,
    pub runs_skipped: usize,
    pub runs_timed_out: usize,
    pub fetched: usize,
    pub transferred: usize,
    pub failed: usize,
    pub send_failures: usize,
    pub delete_failures: usize,
    pub poison_candidates: usize,
    pub last_run_ms: u64,
}

impl TransferMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one run summary into the counters.
    pub fn record_run(&self, summary: &RunSummary) -> MetricsResult<()> {
        let counter = match summary.status {
            RunStatus::Completed => &self.runs_completed,
            RunStatus::Aborted { .. } => &self.runs_aborted,
            RunStatus::Disabled => &self.runs_disabled,
            RunStatus::Skipped => &self.runs_skipped,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        self.fetched.fetch_add(summary.fetched, Ordering::Relaxed);
        self.transferred.fetch_add(summary.transferred, Ordering::Relaxed);
        self.failed.fetch_add(summary.failed, Ordering::Relaxed);
        self.poison_candidates.fetch_add(summary.poison_candidates, Ordering::Relaxed);
        Ok(())
    }

    pub fn record_failure(&self, stage: FailureStage) -> MetricsResult<()> {
        let counter = match stage {
            FailureStage::Send => &self.send_failures,
            FailureStage::Delete => &self.delete_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Record a run cut off by the scheduler's run deadline.
    pub fn record_run_timeout(&self) -> MetricsResult<()> {
        self.runs_timed_out.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn record_run_duration(&self, duration: Duration) -> MetricsResult<()> {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

        // SeqCst for consistency with average_run_duration
        self.total_run_time_micros.fetch_add(micros, Ordering::SeqCst);
        self.timed_runs.fetch_add(1, Ordering::SeqCst);

        self.last_run_time_micros.store(micros, Ordering::Relaxed);
        Ok(())
    }

    /// Average duration of the runs recorded so far.
    ///
    /// # Errors
    /// Returns [`MetricsError::EmptyData`] before the first run is recorded.
    pub fn average_run_duration(&self) -> MetricsResult<Duration> {
        let total = self.total_run_time_micros.load(Ordering::SeqCst);
        let count = self.timed_runs.load(Ordering::SeqCst);

        if count == 0 {
            return Err(MetricsError::EmptyData { metric: "average run duration" });
        }

        Ok(Duration::from_micros(total / count as u64))
    }

    pub fn snapshot(&self) -> TransferMetricsSnapshot {
        TransferMetricsSnapshot {
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            runs_aborted: self.runs_aborted.load(Ordering::Relaxed),
            runs_disabled: self.runs_disabled.load(Ordering::Relaxed),
            runs_skipped: self.runs_skipped.load(Ordering::Relaxed),
            runs_timed_out: self.runs_timed_out.load(Ordering::Relaxed),
            fetched: self.fetched.load(Ordering::Relaxed),
            transferred: self.transferred.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            delete_failures: self.delete_failures.load(Ordering::Relaxed),
            poison_candidates: self.poison_candidates.load(Ordering::Relaxed),
            last_run_ms: self.last_run_time_micros.load(Ordering::Relaxed) / 1_000,
        }
    }
}
