//! Ordered message history.

use serde::{Deserialize, Serialize};

use crate::error::SystemPromptError;
use crate::types::Message;

/// The ordered history of one conversation.
///
/// Only grows through [`Chain::push`]; the single exception is swapping the
/// system message in place via [`Chain::replace_system`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Chain {
    messages: Vec<Message>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Swap the one system message for `message`, keeping its position.
    pub fn replace_system(&mut self, message: Message) -> Result<(), SystemPromptError> {
        if !message.is_system() {
            return Err(SystemPromptError::NotASystemMessage);
        }
        let mut positions = self
            .messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_system())
            .map(|(i, _)| i);
        let index = positions.next().ok_or(SystemPromptError::NoSystemMessage)?;
        if positions.next().is_some() {
            return Err(SystemPromptError::MultipleSystemMessages);
        }
        self.messages[index] = message;
        Ok(())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }
}

impl From<Vec<Message>> for Chain {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
