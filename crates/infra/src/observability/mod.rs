//! Observability infrastructure: transfer metrics and the run reporter.
//!
//! ## Design Principles
//!
//! 1. **Future-Proof Returns**: All record methods return `MetricsResult<()>`
//!    so quotas or validation can be added without API breakage. Callers log
//!    and drop metric errors; a metric never fails a transfer.
//!
//! 2. **Memory Ordering**: SeqCst for values combined into derived metrics
//!    (average run duration), Relaxed for independent counters.

pub mod metrics;
pub mod reporter;

pub use metrics::{TransferMetrics, TransferMetricsSnapshot};
pub use reporter::MetricsReporter;

/// Metrics error type
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Empty data set - cannot calculate aggregate metric
    #[error("Empty data: cannot calculate {metric}")]
    EmptyData {
        /// Metric name that failed (e.g., "average run duration")
        metric: &'static str,
    },
}

/// Result type for metrics operations
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Log and drop a failed metric update.
pub fn log_metric(result: MetricsResult<()>, metric: &'static str) {
    if let Err(err) = result {
        tracing::warn!(metric = metric, error = ?err, "Failed to record metric");
    }
}
