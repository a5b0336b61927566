//! Conversation engine: agents, their histories and profiles.

pub mod agent;
pub mod chain;
pub mod profile;

pub use agent::{Agent, AgentStatus};
pub use chain::Chain;
pub use profile::{AgentProfile, DEFAULT_SYSTEM_PROMPT};
