//! The conversation engine's state: one history, one tool set.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::SystemPromptError;
use crate::tools::ToolSet;
use crate::types::{Message, Role, Usage};

use super::chain::Chain;

/// Lifecycle status of an [`Agent`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Idle,
    Running,
    Failed,
}

/// A conversation: identity, message chain, installed tools.
///
/// Agents are values. Every operation returns an updated agent and
/// snapshots handed to observers are plain clones.
#[derive(Clone)]
pub struct Agent {
    identity: String,
    chain: Chain,
    tools: ToolSet,
    status: AgentStatus,
    usage: Usage,
}

impl Agent {
    /// Create an agent whose history starts with `system`.
    pub fn new(identity: impl Into<String>, system: Message, tools: ToolSet) -> Self {
        let mut chain = Chain::new();
        chain.push(system);
        Self {
            identity: identity.into(),
            chain,
            tools,
            status: AgentStatus::Idle,
            usage: Usage::default(),
        }
    }

    /// Append a message. Plain text becomes a user message.
    pub fn append(mut self, message: impl Into<Message>) -> Self {
        self.push(message);
        self
    }

    /// In-place form of [`Agent::append`].
    pub fn push(&mut self, message: impl Into<Message>) {
        let message = message.into();
        if let Some(usage) = message.usage() {
            self.usage.merge(usage);
        }
        self.chain.push(message);
    }

    /// Same conversation under another identity.
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Union the installed tools with `tools`.
    ///
    /// # Panics
    ///
    /// Panics if any name in `tools` is already installed.
    pub fn install_tools(mut self, tools: ToolSet) -> Self {
        self.tools = self.tools.union(tools);
        self
    }

    /// Return a copy of this agent with its system message swapped.
    ///
    /// Fails if the history has zero or several system messages, or if
    /// `system` is not a system message. `self` is never modified.
    pub fn replace_system_prompt(&self, system: Message) -> Result<Agent, SystemPromptError> {
        let mut next = self.clone();
        next.chain.replace_system(system)?;
        Ok(next)
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn messages(&self) -> &[Message] {
        self.chain.messages()
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    pub fn status(&self) -> AgentStatus {
        self.status
    }

    /// Accumulated usage over every assistant reply in the history.
    pub fn usage(&self) -> &Usage {
        &self.usage
    }

    /// Text of the most recent assistant message, if any.
    pub fn last_assistant_text(&self) -> Option<String> {
        self.chain
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(Message::text)
    }

    pub(crate) fn set_status(&mut self, status: AgentStatus) {
        self.status = status;
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("identity", &self.identity)
            .field("messages", &self.chain.len())
            .field("tools", &self.tools)
            .field("status", &self.status)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn agent() -> Agent {
        Agent::new("test", Message::system("be brief"), ToolSet::new())
    }

    #[test]
    fn append_wraps_plain_text_as_user() {
        let agent = agent().append("hello").append(String::from("again"));
        let roles: Vec<Role> = agent.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::User]);
        assert_eq!(agent.messages()[2].text(), "again");
    }

    #[test]
    fn replace_system_keeps_length_and_position() {
        let agent = agent().append("hi");
        let next = agent.replace_system_prompt(Message::system("new rules")).unwrap();
        assert_eq!(next.messages().len(), 2);
        assert_eq!(next.messages()[0].text(), "new rules");
        assert_eq!(agent.messages()[0].text(), "be brief");
    }

    #[test]
    fn replace_system_error_taxonomy() {
        let agent = agent();
        assert_eq!(
            agent.replace_system_prompt(Message::user("x")).unwrap_err(),
            SystemPromptError::NotASystemMessage
        );

        let none = Agent::new("t", Message::user("no system"), ToolSet::new());
        assert_eq!(
            none.replace_system_prompt(Message::system("s")).unwrap_err(),
            SystemPromptError::NoSystemMessage
        );

        let two = agent.clone().append(Message::system("second"));
        assert_eq!(
            two.replace_system_prompt(Message::system("s")).unwrap_err(),
            SystemPromptError::MultipleSystemMessages
        );
        assert_eq!(two.messages().len(), 2);
    }

    #[test]
    fn push_accumulates_usage() {
        let mut agent = agent();
        agent.push(Message::assistant_reply(
            "ok",
            Vec::new(),
            Some(Usage {
                input_tokens: 5,
                output_tokens: 2,
                total_tokens: 7,
                ..Default::default()
            }),
        ));
        assert_eq!(agent.usage().total_tokens, 7);
        assert_eq!(agent.last_assistant_text().as_deref(), Some("ok"));
    }
}
