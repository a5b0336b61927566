//! Core value types: messages, tool calls and results, usage.

pub mod message;
pub mod usage;

pub use message::*;
pub use usage::*;
