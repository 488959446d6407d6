//! # QueueBridge Infrastructure
//!
//! Infrastructure implementations of the core relay ports.
//!
//! This crate contains:
//! - The SQS source client and the Azure Storage Queue sink client
//! - Configuration loading (file, environment, per-run settings)
//! - The interval scheduler and the single-instance lock
//! - Run metrics and the logging reporter
//!
//! ## Architecture
//! - Implements traits defined in `queuebridge-core`
//! - Depends on `queuebridge-domain` and `queuebridge-core`
//! - Contains all "impure" code (network, filesystem, environment)

pub mod config;
pub mod connector;
pub mod errors;
pub mod http;
pub mod instance_lock;
pub mod observability;
pub mod scheduling;
pub mod sink;
pub mod source;

// Re-export commonly used items
pub use connector::CloudQueueConnector;
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use instance_lock::InstanceLock;
pub use observability::{MetricsReporter, TransferMetrics};
pub use scheduling::{TransferScheduler, TransferSchedulerConfig};
pub use sink::StorageQueueSink;
pub use source::SqsSource;
