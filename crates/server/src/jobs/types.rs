// crates/server/src/jobs/types.rs
//! Types for the training job controller.

use serde::Serialize;
use trainview_core::Generation;

/// Lifecycle state of the single training job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    Idle,
    Running(Generation),
    /// The generation is being retired ahead of a new one.
    ///
    /// Only set inside `restart()` while the lifecycle lock is held, and
    /// replaced by `Running` before the lock is released, so `status()` never
    /// reports it.
    Cancelling(Generation),
}

impl JobState {
    pub fn generation(&self) -> Option<Generation> {
        match self {
            JobState::Idle => None,
            JobState::Running(g) | JobState::Cancelling(g) => Some(*g),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Running(_) => "running",
            JobState::Cancelling(_) => "cancelling",
        }
    }
}

/// Result of a control operation, as returned to the request layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ControlOutcome {
    pub success: bool,
    pub message: String,
}

impl ControlOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Snapshot of the controller for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub state: &'static str,
    pub generation: Option<Generation>,
    pub sessions: usize,
}

/// Result of handing one record to the forwarding boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forwarded {
    /// Broadcast as metrics; `tip` tells whether a notice followed it.
    Delivered { tip: bool },
    /// The record's generation is no longer current.
    Stale,
}
