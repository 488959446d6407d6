//! Scheduling for bridge runs
//!
//! The scheduler follows the runtime rules every background task here keeps:
//! - Explicit lifecycle management (start/stop)
//! - Join handles for spawned tasks
//! - Cancellation token support
//! - A deadline on every run

pub mod error;
pub mod transfer_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use transfer_scheduler::{TransferScheduler, TransferSchedulerConfig};
