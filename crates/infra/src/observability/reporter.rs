//! [`RunReporter`] that logs run summaries and feeds [`TransferMetrics`].

use std::sync::Arc;

use queuebridge_core::RunReporter;
use queuebridge_domain::{BridgeError, FailureStage, Message, RunStatus, RunSummary};
use tracing::{debug, info, warn};

use super::{log_metric, TransferMetrics};

pub struct MetricsReporter {
    metrics: Arc<TransferMetrics>,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<TransferMetrics>) -> Self {
        Self { metrics }
    }
}

impl RunReporter for MetricsReporter {
    fn report_summary(&self, summary: &RunSummary) {
        match &summary.status {
            RunStatus::Aborted { error } => warn!(
                fetched = summary.fetched,
                transferred = summary.transferred,
                failed = summary.failed,
                error_kind = error.label(),
                error = %error,
                "transfer.run.summary"
            ),
            RunStatus::Completed => info!(
                fetched = summary.fetched,
                transferred = summary.transferred,
                failed = summary.failed,
                poison_candidates = summary.poison_candidates,
                "transfer.run.summary"
            ),
            RunStatus::Disabled | RunStatus::Skipped => debug!(
                status = ?summary.status,
                "transfer.run.summary"
            ),
        }
        log_metric(self.metrics.record_run(summary), "transfer.run");
    }

    fn report_failure(&self, message: &Message, stage: FailureStage, error: &BridgeError) {
        debug!(message_id = %message.id, stage = %stage, error_kind = error.label(), "transfer.failure.recorded");
        log_metric(self.metrics.record_failure(stage), "transfer.failure");
    }
}
