//! Run gate: the enable switch and the single-flight permit.
//!
//! The enable flag is passed in fresh for every run so operators can toggle
//! it without a redeploy. The permit stops a second run from starting while a
//! previous one (for example an overrunning one) is still in flight.

use std::sync::atomic::{AtomicBool, Ordering};

/// Result of asking the gate whether a run may start.
#[derive(Debug)]
pub enum GateDecision<'a> {
    /// The enable flag is off
    Disabled,
    /// Another run holds the permit
    Busy,
    /// The run may proceed while the permit is held
    Open(RunPermit<'a>),
}

/// Gate shared by every run of one bridge instance.
#[derive(Debug, Default)]
pub struct RunGate {
    in_flight: AtomicBool,
}

impl RunGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the enable flag, then try to take the single-flight permit.
    pub fn try_enter(&self, enabled: bool) -> GateDecision<'_> {
        if !enabled {
            return GateDecision::Disabled;
        }

        match self.in_flight.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => GateDecision::Open(RunPermit { in_flight: &self.in_flight }),
            Err(_) => GateDecision::Busy,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Held for the duration of one run; released on drop.
#[derive(Debug)]
pub struct RunPermit<'a> {
    in_flight: &'a AtomicBool,
}

impl Drop for RunPermit<'_> {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}
