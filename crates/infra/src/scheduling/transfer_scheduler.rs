//! Interval scheduler driving bridge runs.
//!
//! Each tick re-reads the run configuration, then runs the bridge under the
//! run deadline. A run cut off by the deadline or by shutdown is reported as
//! an aborted summary carrying the counts it reached, so every tick produces
//! exactly one summary. Messages
//! left undeleted by a cut-off run resurface after their visibility timeout.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use queuebridge_core::{Bridge, RunReporter};
//! use queuebridge_infra::config::EnvRunConfigSource;
//! use queuebridge_infra::observability::{MetricsReporter, TransferMetrics};
//! use queuebridge_infra::scheduling::{TransferScheduler, TransferSchedulerConfig};
//!
//! # async fn example(bridge: Arc<Bridge>) -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = Arc::new(TransferMetrics::new());
//! let reporter: Arc<dyn RunReporter> = Arc::new(MetricsReporter::new(Arc::clone(&metrics)));
//! let mut scheduler = TransferScheduler::new(
//!     bridge,
//!     Arc::new(EnvRunConfigSource),
//!     reporter,
//!     metrics,
//!     TransferSchedulerConfig::default(),
//! );
//!
//! scheduler.start().await?;
//! // ... until shutdown ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use queuebridge_core::{Bridge, RunConfigSource, RunProgress, RunReporter};
use queuebridge_domain::constants::{DEFAULT_RUN_INTERVAL, DEFAULT_RUN_TIMEOUT};
use queuebridge_domain::{BridgeError, BridgeSettings, RunSummary};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::observability::{log_metric, TransferMetrics};
use crate::scheduling::error::{SchedulerError, SchedulerResult};

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Configuration for the transfer scheduler
#[derive(Debug, Clone)]
pub struct TransferSchedulerConfig {
    /// Time between run starts
    pub interval: Duration,
    /// Deadline for one whole run
    pub run_timeout: Duration,
    /// How long `stop` waits for the loop task to finish
    pub join_timeout: Duration,
}

impl Default for TransferSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RUN_INTERVAL,
            run_timeout: DEFAULT_RUN_TIMEOUT,
            join_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&BridgeSettings> for TransferSchedulerConfig {
    fn from(settings: &BridgeSettings) -> Self {
        Self {
            interval: settings.run_interval(),
            run_timeout: settings.run_timeout(),
            ..Self::default()
        }
    }
}

/// Everything one tick needs, shared with the background task.
struct RunContext {
    bridge: Arc<Bridge>,
    config_source: Arc<dyn RunConfigSource>,
    reporter: Arc<dyn RunReporter>,
    metrics: Arc<TransferMetrics>,
    run_timeout: Duration,
}

impl RunContext {
    async fn run_once(&self, cancel: &CancellationToken) -> RunSummary {
        let config = self.config_source.load();
        let progress = Arc::new(RunProgress::new());
        let started = Instant::now();

        let run = self.bridge.run_tracked(&config, Arc::clone(&progress));
        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(BridgeError::Internal("run cancelled by shutdown".into())),
            result = tokio::time::timeout(self.run_timeout, run) => {
                result.map_err(|_| BridgeError::Timeout(self.run_timeout))
            }
        };

        log_metric(self.metrics.record_run_duration(started.elapsed()), "transfer.run.duration");

        match outcome {
            Ok(summary) => summary,
            Err(error) => {
                if matches!(error, BridgeError::Timeout(_)) {
                    log_metric(self.metrics.record_run_timeout(), "transfer.run.timeout");
                }
                warn!(error_kind = error.label(), error = %error, "transfer.run.cut_off");
                // Messages already deleted stay counted as transferred
                let summary = progress.aborted(error);
                self.reporter.report_summary(&summary);
                summary
            }
        }
    }
}

/// Runs the bridge on a fixed interval until stopped.
pub struct TransferScheduler {
    context: Arc<RunContext>,
    config: TransferSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl TransferScheduler {
    pub fn new(
        bridge: Arc<Bridge>,
        config_source: Arc<dyn RunConfigSource>,
        reporter: Arc<dyn RunReporter>,
        metrics: Arc<TransferMetrics>,
        config: TransferSchedulerConfig,
    ) -> Self {
        let context = RunContext {
            bridge,
            config_source,
            reporter,
            metrics,
            run_timeout: config.run_timeout,
        };
        Self {
            context: Arc::new(context),
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Execute a single run in the caller's task.
    ///
    /// Used when an external timer owns the schedule.
    pub async fn run_once(&self) -> RunSummary {
        self.context.run_once(&self.cancellation_token).await
    }

    /// Start the scheduler
    ///
    /// The first run starts immediately, later runs every `interval`. A run
    /// that overruns the interval delays the next tick rather than stacking.
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is already running
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(interval_secs = self.config.interval.as_secs(), "transfer.scheduler.starting");

        // Fresh token so the scheduler can be restarted after stop
        self.cancellation_token = CancellationToken::new();

        let context = Arc::clone(&self.context);
        let interval = self.config.interval;
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::run_loop(context, interval, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);

        info!("transfer.scheduler.started");
        Ok(())
    }

    /// Stop the scheduler gracefully
    ///
    /// Cancels the background task, including a run in flight, and awaits
    /// completion.
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is not running or the task does not finish
    /// within the join timeout
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        info!("transfer.scheduler.stopping");
        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|e| SchedulerError::TaskJoinFailed(e.to_string()))?;
        }

        info!("transfer.scheduler.stopped");
        Ok(())
    }

    /// Check if scheduler is running
    ///
    /// A scheduler is considered running if it has an active task handle that
    /// hasn't finished.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    async fn run_loop(context: Arc<RunContext>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("transfer.scheduler.loop_cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    context.run_once(&cancel).await;
                }
            }
        }
    }

    /// Cancel outstanding work; returns whether a loop task was still live.
    fn cancel_on_drop(&self) -> bool {
        let live = self.is_running();
        self.cancellation_token.cancel();
        live
    }
}

/// Ensure scheduler is stopped when dropped
impl Drop for TransferScheduler {
    fn drop(&mut self) {
        if self.cancel_on_drop() {
            warn!("TransferScheduler dropped while running; cancelling");
        }
    }
}
