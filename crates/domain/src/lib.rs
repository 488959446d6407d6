//! # QueueBridge Domain
//!
//! Domain types shared by every QueueBridge crate.
//!
//! This crate contains:
//! - Transfer data types (Message, Batch, TransferOutcome, RunSummary)
//! - The bridge error taxonomy and Result alias
//! - Per-run and startup configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other QueueBridge crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
