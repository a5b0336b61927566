//! Named starting points for new agents.

use bon::Builder;

use crate::tools::ToolSet;
use crate::types::Message;

use super::agent::Agent;

/// Default instructions for a coding agent working in a thread.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a coding assistant working inside a project directory. \
Use the available tools to inspect and change files and to run commands. \
Paths are relative to the working directory. \
When a task is large or self-contained, hand it to the `delegate` tool with a \
clear description and plan. Reply concisely once the work is done.";

/// The base configuration an agent is built from.
///
/// Sub-agents are always built from a profile, never from a live parent, so
/// edits to a parent's history cannot leak into its children.
#[derive(Debug, Clone, Builder)]
pub struct AgentProfile {
    #[builder(into, default = "coder".to_string())]
    pub identity: String,
    #[builder(into, default = DEFAULT_SYSTEM_PROMPT.to_string())]
    pub system_prompt: String,
}

impl AgentProfile {
    /// Build a fresh agent carrying `tools`.
    pub fn build(&self, tools: ToolSet) -> Agent {
        Agent::new(
            self.identity.clone(),
            Message::system(self.system_prompt.clone()),
            tools,
        )
    }
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_builds_single_system_message() {
        let agent = AgentProfile::default().build(ToolSet::new());
        assert_eq!(agent.identity(), "coder");
        assert_eq!(agent.messages().len(), 1);
        assert!(agent.messages()[0].is_system());
    }

    #[test]
    fn builder_overrides_prompt() {
        let profile = AgentProfile::builder().system_prompt("terse").build();
        assert_eq!(profile.build(ToolSet::new()).messages()[0].text(), "terse");
    }
}
