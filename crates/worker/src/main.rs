//! QueueBridge worker
//!
//! Relays messages from an Amazon SQS queue to an Azure Storage queue on a
//! fixed interval, or once when `QUEUEBRIDGE_RUN_MODE=once`.

mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use queuebridge_core::{Bridge, RunReporter, TransferSettings};
use queuebridge_domain::{BridgeSettings, RunMode};
use queuebridge_infra::config::{load_settings, EnvRunConfigSource};
use queuebridge_infra::{
    CloudQueueConnector, HttpClient, InstanceLock, MetricsReporter, TransferMetrics,
    TransferScheduler, TransferSchedulerConfig,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; loaded before logging so RUST_LOG in it applies
    let dotenv = dotenvy::dotenv();
    logging::init(logging::LogFormat::from_env())?;
    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(e) => tracing::debug!(error = %e, "No .env file loaded"),
    }

    let settings = load_settings().context("loading startup settings")?;
    if !settings.has_safe_visibility_margin() {
        warn!(
            visibility_timeout_seconds = settings.visibility_timeout_seconds,
            run_timeout_seconds = settings.run_timeout_seconds,
            run_interval_seconds = settings.run_interval_seconds,
            "Visibility timeout does not outlast a run plus one interval; messages may be relayed twice"
        );
    }

    let _lock = InstanceLock::acquire(pid_dir(&settings)).context("acquiring instance lock")?;

    let metrics = Arc::new(TransferMetrics::new());
    let mut scheduler = build_scheduler(&settings, Arc::clone(&metrics))?;

    info!(version = env!("CARGO_PKG_VERSION"), mode = ?settings.run_mode, "QueueBridge starting");

    match settings.run_mode {
        RunMode::Once => {
            let summary = scheduler.run_once().await;
            info!(metrics = ?metrics.snapshot(), "QueueBridge finished");
            if let Some(error) = summary.error() {
                anyhow::bail!("run aborted: {error}");
            }
        }
        RunMode::Interval => {
            scheduler.start().await?;
            tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
            info!("Shutdown signal received");
            scheduler.stop().await?;
            info!(metrics = ?metrics.snapshot(), "QueueBridge stopped");
        }
    }

    Ok(())
}

fn build_scheduler(
    settings: &BridgeSettings,
    metrics: Arc<TransferMetrics>,
) -> anyhow::Result<TransferScheduler> {
    let http = HttpClient::builder()
        .timeout(settings.operation_timeout())
        .build()
        .context("building HTTP client")?;
    let connector = Arc::new(CloudQueueConnector::new(http));
    let reporter: Arc<dyn RunReporter> = Arc::new(MetricsReporter::new(Arc::clone(&metrics)));
    let bridge =
        Arc::new(Bridge::new(connector, Arc::clone(&reporter), TransferSettings::from(settings)));

    Ok(TransferScheduler::new(
        bridge,
        Arc::new(EnvRunConfigSource),
        reporter,
        metrics,
        TransferSchedulerConfig::from(settings),
    ))
}

fn pid_dir(settings: &BridgeSettings) -> PathBuf {
    settings.pid_dir.as_ref().map_or_else(std::env::temp_dir, PathBuf::from)
}
