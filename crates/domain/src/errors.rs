//! Error types used throughout the bridge

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for QueueBridge
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Source queue unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Sink queue unavailable: {0}")]
    SinkUnavailable(String),

    #[error("Invalid receipt handle: {0}")]
    InvalidReceiptHandle(String),

    #[error("Payload too large: {actual} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize, actual: usize },

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Stable label suitable for metrics and log fields.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::SourceUnavailable(_) => "source_unavailable",
            Self::SinkUnavailable(_) => "sink_unavailable",
            Self::InvalidReceiptHandle(_) => "invalid_receipt_handle",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
