//! One complete bridge run.
//!
//! Order of a run, and nothing happens before the step that precedes it:
//! 1. gate check (enable flag, single-flight permit)
//! 2. connection settings validation
//! 3. client construction through the [`QueueConnector`]
//! 4. the [`TransferLoop`] batch
//! 5. exactly one summary to the [`RunReporter`]

use std::sync::Arc;

use queuebridge_domain::{Result, RunConfig, RunSummary};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::gate::{GateDecision, RunGate};
use crate::ports::{QueueConnector, RunReporter};
use crate::progress::RunProgress;
use crate::transfer::{TransferLoop, TransferSettings};

/// Entry point invoked once per scheduled tick.
pub struct Bridge {
    connector: Arc<dyn QueueConnector>,
    reporter: Arc<dyn RunReporter>,
    settings: TransferSettings,
    gate: RunGate,
}

impl Bridge {
    pub fn new(
        connector: Arc<dyn QueueConnector>,
        reporter: Arc<dyn RunReporter>,
        settings: TransferSettings,
    ) -> Self {
        Self { connector, reporter, settings, gate: RunGate::new() }
    }

    /// Execute one run against `config` and report its summary.
    ///
    /// Never fails: run-fatal errors come back as an aborted summary so the
    /// scheduler can log them and wait for the next tick.
    pub async fn run(&self, config: &RunConfig) -> RunSummary {
        self.run_tracked(config, Arc::new(RunProgress::new())).await
    }

    /// Like [`Bridge::run`], recording live counts into `progress`.
    ///
    /// A caller that drops this future before it completes owns the summary
    /// for the run and builds it with [`RunProgress::aborted`].
    pub async fn run_tracked(&self, config: &RunConfig, progress: Arc<RunProgress>) -> RunSummary {
        let run_id = Uuid::new_v4();
        let summary = self
            .run_gated(config, progress)
            .instrument(info_span!("transfer.run", run_id = %run_id))
            .await;
        self.reporter.report_summary(&summary);
        summary
    }

    async fn run_gated(&self, config: &RunConfig, progress: Arc<RunProgress>) -> RunSummary {
        let _permit = match self.gate.try_enter(config.enabled) {
            GateDecision::Disabled => {
                info!("transfer.run.disabled");
                return RunSummary::disabled();
            }
            GateDecision::Busy => {
                info!("transfer.run.skipped_in_flight");
                return RunSummary::skipped();
            }
            GateDecision::Open(permit) => permit,
        };

        match self.run_open(config, progress).await {
            Ok(summary) => summary,
            Err(err) => {
                error!(error_kind = err.label(), error = %err, "transfer.run.aborted");
                RunSummary::aborted(err)
            }
        }
    }

    async fn run_open(&self, config: &RunConfig, progress: Arc<RunProgress>) -> Result<RunSummary> {
        let settings = config.connection.validate()?;
        let clients = self.connector.connect(&settings).await?;

        TransferLoop::new(clients, Arc::clone(&self.reporter), self.settings.clone())
            .with_progress(progress)
            .run_batch()
            .await
    }

    /// Whether a run currently holds the gate.
    pub fn is_run_in_flight(&self) -> bool {
        self.gate.is_in_flight()
    }
}
