//! Turn modes and outcomes.

use thiserror::Error;

use crate::agent::Agent;
use crate::error::SkeinError;
use crate::types::ToolResult;

/// When a turn is allowed to stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnMode {
    /// Stop on the first reply that requests no tools.
    UntilSuccess,
    /// Keep answering tool requests; stop once none are requested.
    WhileNeedsResponse,
    /// Stop as soon as the named tool produces a successful result. Plain
    /// replies do not end the turn.
    UntilToolUsed(String),
}

impl TurnMode {
    pub fn until_tool_used(name: impl Into<String>) -> Self {
        Self::UntilToolUsed(name.into())
    }
}

/// Why a turn ended successfully.
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    /// The model replied without requesting tools.
    Completed,
    /// The target tool of [`TurnMode::UntilToolUsed`] ran.
    ToolUsed(ToolResult),
}

/// A turn that reached a terminal state.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub agent: Agent,
    pub stop: StopReason,
}

/// What aborted a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnFailure {
    /// The provider call failed.
    Provider,
    /// A tool raised a fatal fault or its task panicked.
    Tool,
    /// The loop ran out of iterations.
    IterationLimit,
}

/// A turn that was aborted. `agent` holds every message appended before the
/// failure.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct TurnError {
    pub agent: Agent,
    pub kind: TurnFailure,
    pub reason: String,
}

impl From<TurnError> for SkeinError {
    fn from(err: TurnError) -> Self {
        SkeinError::Turn(err.reason)
    }
}
