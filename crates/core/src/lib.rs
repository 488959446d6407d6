//! # QueueBridge Core
//!
//! Pure relay logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces for the source queue, the sink queue, client
//!   construction, configuration and reporting
//! - The run gate (enable flag + single-flight permit)
//! - The transfer loop and the per-run orchestration around it
//! - Live run progress for callers that cut runs off
//!
//! ## Architecture Principles
//! - Only depends on `queuebridge-domain`
//! - No network, AWS or Azure code
//! - All external collaborators via traits
//! - Deterministic, testable with in-memory fakes

pub mod bridge;
pub mod gate;
pub mod ports;
pub mod progress;
pub mod transfer;

pub use bridge::Bridge;
pub use gate::{GateDecision, RunGate, RunPermit};
pub use ports::{
    NoopReporter, QueueClients, QueueConnector, RunConfigSource, RunReporter, SinkQueue,
    SourceQueue,
};
pub use progress::RunProgress;
pub use transfer::{TransferLoop, TransferSettings};
