//! Bridge constants
//!
//! Centralized location for the limits and defaults used across the bridge.

use std::time::Duration;

// Source queue limits
pub const MAX_RECEIVE_BATCH: usize = 10;
pub const DEFAULT_BATCH_SIZE: usize = 10;

// Run schedule (visibility timeout is 3x the interval)
pub const DEFAULT_RUN_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(180);
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(50);
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_CONCURRENCY: usize = 1;

// Poison candidates are reported, never rerouted
pub const DEFAULT_POISON_RECEIVE_THRESHOLD: u32 = 5;

// Azure Storage Queues cap the message text at 64 KiB
pub const MAX_SINK_MESSAGE_BYTES: usize = 64 * 1024;

pub const PID_FILE_NAME: &str = "queuebridge.pid";
