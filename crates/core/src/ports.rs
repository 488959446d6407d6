//! Port interfaces for the relay
//!
//! Every network-facing collaborator of the transfer loop sits behind one of
//! these traits. Infrastructure implementations live in `queuebridge-infra`;
//! tests use in-memory fakes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use queuebridge_domain::{
    Batch, BridgeError, ConnectionSettings, FailureStage, Message, Result, RunConfig,
    RunSummary,
};

/// Pull-based queue being drained.
#[async_trait]
pub trait SourceQueue: Send + Sync {
    /// Receive up to `max_messages` without waiting.
    ///
    /// Received messages stay hidden from other receivers for
    /// `visibility_timeout`. An empty batch is not an error.
    async fn receive(&self, max_messages: usize, visibility_timeout: Duration) -> Result<Batch>;

    /// Permanently remove the received message identified by `receipt_handle`.
    ///
    /// Returns [`BridgeError::InvalidReceiptHandle`] when the lease has already
    /// expired or the message is gone.
    async fn delete(&self, receipt_handle: &str) -> Result<()>;
}

/// Push-based queue receiving relayed messages.
#[async_trait]
pub trait SinkQueue: Send + Sync {
    /// Create the destination queue if it does not exist. Idempotent.
    async fn ensure_exists(&self) -> Result<()>;

    /// Send one opaque payload; the implementation owns the wire encoding.
    async fn send(&self, body: &[u8]) -> Result<()>;
}

/// The client pair a run works with.
#[derive(Clone)]
pub struct QueueClients {
    pub source: Arc<dyn SourceQueue>,
    pub sink: Arc<dyn SinkQueue>,
}

/// Builds queue clients from validated connection settings.
///
/// Implementations own whatever client reuse they do; nothing is shared
/// through process-wide state.
#[async_trait]
pub trait QueueConnector: Send + Sync {
    /// Return clients for `settings`. Must not perform queue operations.
    async fn connect(&self, settings: &ConnectionSettings) -> Result<QueueClients>;
}

/// Supplies the per-run configuration. Called once at the start of each run.
pub trait RunConfigSource: Send + Sync {
    fn load(&self) -> RunConfig;
}

/// Receives run summaries and per-message failures.
pub trait RunReporter: Send + Sync {
    /// Called exactly once per run, whatever the outcome.
    fn report_summary(&self, summary: &RunSummary);

    /// Called for every message that failed to transfer.
    fn report_failure(&self, message: &Message, stage: FailureStage, error: &BridgeError);
}

/// Reporter that only relies on the structured log lines the loop already emits.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl RunReporter for NoopReporter {
    fn report_summary(&self, _summary: &RunSummary) {}

    fn report_failure(&self, _message: &Message, _stage: FailureStage, _error: &BridgeError) {}
}
