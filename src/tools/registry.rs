//! Named tool collections.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::tool::Tool;
use crate::error::SkeinError;

/// Wire-facing description of a tool, as sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// An ordered set of tools with unique names.
///
/// Append-only: tools are never removed once installed.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool.
    ///
    /// # Panics
    ///
    /// Panics if a tool with the same name is already present. Use
    /// [`ToolSet::try_insert`] when names come from untrusted input.
    pub fn insert(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.try_insert(tool).is_err() {
            panic!("duplicate tool name: {name}");
        }
    }

    /// Add a tool, failing if the name is taken.
    pub fn try_insert(&mut self, tool: Arc<dyn Tool>) -> Result<(), SkeinError> {
        if self.contains(tool.name()) {
            return Err(SkeinError::InvalidArgument(format!(
                "duplicate tool name: {}",
                tool.name()
            )));
        }
        self.tools.push(tool);
        Ok(())
    }

    /// Builder form of [`ToolSet::insert`].
    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.insert(tool);
        self
    }

    /// Union with another set.
    ///
    /// # Panics
    ///
    /// Panics on any name collision.
    pub fn union(mut self, other: ToolSet) -> Self {
        for tool in other.tools {
            self.insert(tool);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.iter()
    }

    /// Schemas for every tool, in insertion order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters().schema.clone(),
            })
            .collect()
    }
}

impl FromIterator<Arc<dyn Tool>> for ToolSet {
    /// # Panics
    ///
    /// Panics on duplicate names, like [`ToolSet::insert`].
    fn from_iter<I: IntoIterator<Item = Arc<dyn Tool>>>(iter: I) -> Self {
        let mut set = ToolSet::new();
        for tool in iter {
            set.insert(tool);
        }
        set
    }
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
