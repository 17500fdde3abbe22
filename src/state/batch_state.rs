//! Batch lifecycle states
//!
//! A batch moves `Idle -> Running -> Draining -> Done`. The only other exit is
//! `Running -> Aborted`, taken when the output can no longer be written.

use std::fmt;

/// Represents the current state of a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BatchState {
    /// Tasks built, nothing dispatched yet
    #[default]
    Idle,

    /// Probes are being dispatched to the worker pool
    Running,

    /// No more dispatching; waiting for the sink to be finalized
    Draining,

    /// Sink finalized, summary available
    Done,

    /// Fatal, non-recoverable condition (e.g. output unwritable)
    Aborted,
}

impl BatchState {
    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: BatchState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Running, Self::Draining)
                | (Self::Running, Self::Aborted)
                | (Self::Draining, Self::Done)
        )
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}
