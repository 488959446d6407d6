//! Transfer loop: one batch from the source relayed to the sink.
//!
//! Per message the order is always send, then delete. A message is deleted
//! from the source only after the sink confirmed the send; any failure leaves
//! it in the source, where the visibility timeout resurfaces it for a later
//! run. Nothing is retried inside a run.
//!
//! Failures to ensure the sink or to receive are run-fatal and propagate to
//! the caller. Failures to send or delete are recorded per message and never
//! stop the rest of the batch.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use queuebridge_domain::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_CONCURRENCY, DEFAULT_OPERATION_TIMEOUT,
    DEFAULT_POISON_RECEIVE_THRESHOLD, DEFAULT_VISIBILITY_TIMEOUT, MAX_RECEIVE_BATCH,
};
use queuebridge_domain::{
    BridgeError, BridgeSettings, FailureStage, Message, Result, RunSummary, TransferOutcome,
};
use tracing::{debug, info, warn};

use crate::ports::{QueueClients, RunReporter, SinkQueue, SourceQueue};
use crate::progress::RunProgress;

/// Tuning for a single transfer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSettings {
    /// Messages requested per receive (1..=10)
    pub batch_size: usize,
    /// Lease taken on every received message
    pub visibility_timeout: Duration,
    /// Deadline for each individual queue call
    pub operation_timeout: Duration,
    /// Messages relayed at the same time; 1 means strictly sequential
    pub max_concurrency: usize,
    /// Receive count above which a message is reported as a poison candidate
    pub poison_receive_threshold: u32,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            poison_receive_threshold: DEFAULT_POISON_RECEIVE_THRESHOLD,
        }
    }
}

impl From<&BridgeSettings> for TransferSettings {
    fn from(settings: &BridgeSettings) -> Self {
        Self {
            batch_size: settings.batch_size,
            visibility_timeout: settings.visibility_timeout(),
            operation_timeout: settings.operation_timeout(),
            max_concurrency: settings.max_concurrency,
            poison_receive_threshold: settings.poison_receive_threshold,
        }
    }
}

/// Relays one batch between an injected source and sink.
pub struct TransferLoop {
    source: Arc<dyn SourceQueue>,
    sink: Arc<dyn SinkQueue>,
    reporter: Arc<dyn RunReporter>,
    settings: TransferSettings,
    progress: Arc<RunProgress>,
}

impl TransferLoop {
    pub fn new(
        clients: QueueClients,
        reporter: Arc<dyn RunReporter>,
        settings: TransferSettings,
    ) -> Self {
        let QueueClients { source, sink } = clients;
        Self { source, sink, reporter, settings, progress: Arc::new(RunProgress::new()) }
    }

    /// Record into `progress` as messages settle, for callers that may cut
    /// the run off.
    pub fn with_progress(mut self, progress: Arc<RunProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// Ensure the sink, receive one batch and relay every message in it.
    ///
    /// The returned summary always satisfies
    /// `fetched == transferred + failed`.
    ///
    /// # Errors
    /// Returns the run-fatal error when the sink cannot be ensured or the
    /// receive call fails. No message has been touched in either case.
    pub async fn run_batch(&self) -> Result<RunSummary> {
        self.bounded(self.sink.ensure_exists()).await?;

        let batch_size = self.settings.batch_size.clamp(1, MAX_RECEIVE_BATCH);
        let batch = self
            .bounded(self.source.receive(batch_size, self.settings.visibility_timeout))
            .await?;

        if batch.is_empty() {
            debug!("transfer.batch.empty");
            return Ok(RunSummary::from_outcomes(&[], 0));
        }

        info!(count = batch.len(), "transfer.batch.received");

        let poison_candidates = batch.iter().filter(|m| self.is_poison_candidate(m)).count();
        self.progress.record_received(batch.len(), poison_candidates);

        // Boxed up front so the batch future stays Send for any lifetime.
        let relays: Vec<BoxFuture<'_, TransferOutcome>> =
            batch.iter().map(|message| Box::pin(self.relay(message)) as BoxFuture<'_, _>).collect();
        let outcomes: Vec<TransferOutcome> = stream::iter(relays)
            .buffer_unordered(self.settings.max_concurrency.max(1))
            .collect()
            .await;

        Ok(RunSummary::from_outcomes(&outcomes, poison_candidates))
    }

    async fn relay(&self, message: &Message) -> TransferOutcome {
        let outcome = self.transfer_message(message).await;
        self.progress.record_outcome(&outcome);
        outcome
    }

    /// Send one message, then delete it from the source if the send succeeded.
    pub async fn transfer_message(&self, message: &Message) -> TransferOutcome {
        if let Err(error) = self.bounded(self.sink.send(&message.body)).await {
            return self.failed(message, FailureStage::Send, error);
        }

        match self.bounded(self.source.delete(&message.receipt_handle)).await {
            Ok(()) => {
                debug!(message_id = %message.id, "transfer.message.transferred");
                TransferOutcome::Transferred
            }
            Err(BridgeError::InvalidReceiptHandle(reason)) => {
                // Already gone from the source: the removal we wanted happened.
                debug!(
                    message_id = %message.id,
                    reason = %reason,
                    "transfer.message.delete_already_applied"
                );
                TransferOutcome::Transferred
            }
            Err(error) => self.failed(message, FailureStage::Delete, error),
        }
    }

    fn failed(&self, message: &Message, stage: FailureStage, error: BridgeError) -> TransferOutcome {
        warn!(
            message_id = %message.id,
            stage = %stage,
            error_kind = error.label(),
            error = %error,
            "transfer.message.failed"
        );
        self.reporter.report_failure(message, stage, &error);
        TransferOutcome::Failed { stage, error }
    }

    fn is_poison_candidate(&self, message: &Message) -> bool {
        match message.receive_count {
            Some(count) if count > self.settings.poison_receive_threshold => {
                warn!(
                    message_id = %message.id,
                    receive_count = count,
                    threshold = self.settings.poison_receive_threshold,
                    "transfer.message.poison_candidate"
                );
                true
            }
            _ => false,
        }
    }

    async fn bounded<T, F>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let limit = self.settings.operation_timeout;
        tokio::time::timeout(limit, operation).await.map_err(|_| BridgeError::Timeout(limit))?
    }
}
