//! Tool invocation loop.

pub mod limits;
pub mod runner;
mod tooling;
pub mod types;


pub use limits::{LoopLimits, DEFAULT_DELEGATION_MAX_ITERATIONS, DEFAULT_MAX_ITERATIONS};
pub use runner::LoopRunner;
pub use types::{StopReason, TurnError, TurnFailure, TurnMode, TurnOutcome};
