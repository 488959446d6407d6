//! Transfer data types
//!
//! A [`Message`] only lives for the duration of one run: it is received,
//! optionally relayed and deleted, then dropped. Nothing here is persisted.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::BridgeError;

/// One unit of transfer received from the source queue.
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    /// Source-assigned identifier, used for logging only
    pub id: String,
    /// Opaque payload, relayed byte-for-byte
    pub body: Vec<u8>,
    /// Lease token required to delete this received instance
    pub receipt_handle: String,
    /// Approximate number of times the source has handed this message out
    pub receive_count: Option<u32>,
}

impl Message {
    pub fn new(id: impl Into<String>, body: impl Into<Vec<u8>>, receipt_handle: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            receipt_handle: receipt_handle.into(),
            receive_count: None,
        }
    }

    pub fn with_receive_count(mut self, count: u32) -> Self {
        self.receive_count = Some(count);
        self
    }
}

// Bodies and handles stay out of logs.
impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id)
            .field("body_len", &self.body.len())
            .field("receive_count", &self.receive_count)
            .finish_non_exhaustive()
    }
}

/// Messages returned by one receive call. Order carries no meaning.
pub type Batch = Vec<Message>;

/// Step of the per-message transfer that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Send,
    Delete,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send => f.write_str("send"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// Per-message result of a transfer attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Sent to the sink and removed from the source
    Transferred,
    /// Left in the source; it resurfaces once the visibility timeout expires
    Failed { stage: FailureStage, error: BridgeError },
}

impl TransferOutcome {
    pub fn is_transferred(&self) -> bool {
        matches!(self, Self::Transferred)
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// The batch was processed (individual messages may still have failed)
    Completed,
    /// The enable flag was off
    Disabled,
    /// Another run was still in flight
    Skipped,
    /// A run-fatal error stopped the run before or during receive
    Aborted { error: BridgeError },
}

/// The one summary every run emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub fetched: usize,
    pub transferred: usize,
    pub failed: usize,
    pub poison_candidates: usize,
    #[serde(flatten)]
    pub status: RunStatus,
}

impl RunSummary {
    fn empty(status: RunStatus) -> Self {
        Self { fetched: 0, transferred: 0, failed: 0, poison_candidates: 0, status }
    }

    pub fn disabled() -> Self {
        Self::empty(RunStatus::Disabled)
    }

    pub fn skipped() -> Self {
        Self::empty(RunStatus::Skipped)
    }

    /// All-zero summary carrying the reason the run stopped.
    pub fn aborted(error: BridgeError) -> Self {
        Self::empty(RunStatus::Aborted { error })
    }

    /// Aggregate per-message outcomes into a completed summary.
    pub fn from_outcomes<'a, I>(outcomes: I, poison_candidates: usize) -> Self
    where
        I: IntoIterator<Item = &'a TransferOutcome>,
    {
        let mut summary = Self::empty(RunStatus::Completed);
        summary.poison_candidates = poison_candidates;
        for outcome in outcomes {
            summary.fetched += 1;
            if outcome.is_transferred() {
                summary.transferred += 1;
            } else {
                summary.failed += 1;
            }
        }
        summary
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.status, RunStatus::Aborted { .. })
    }

    pub fn error(&self) -> Option<&BridgeError> {
        match &self.status {
            RunStatus::Aborted { error } => Some(error),
            _ => None,
        }
    }
}
