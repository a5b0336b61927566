//! The restricted tool kit handed to delegated conversations.

use std::sync::Arc;

use strum::{Display, EnumIter, IntoEnumIterator};

use crate::tools::builtin;
use crate::tools::{Tool, ToolSet};

/// A capability a child conversation may be granted.
///
/// There is deliberately no variant for delegation, so a child can never
/// spawn grandchildren.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ChildCapability {
    Shell,
    ReadFile,
    CreateFile,
    EditFile,
    ListDirectory,
    Glob,
    Grep,
}

impl ChildCapability {
    pub fn tool(self) -> Arc<dyn Tool> {
        match self {
            Self::Shell => builtin::shell_tool(),
            Self::ReadFile => builtin::read_file_tool(),
            Self::CreateFile => builtin::create_file_tool(),
            Self::EditFile => builtin::edit_file_tool(),
            Self::ListDirectory => builtin::list_directory_tool(),
            Self::Glob => builtin::glob_tool(),
            Self::Grep => builtin::grep_tool(),
        }
    }
}

/// A set of child capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildToolKit {
    capabilities: Vec<ChildCapability>,
}

impl ChildToolKit {
    /// Every file and shell capability.
    pub fn full() -> Self {
        Self {
            capabilities: ChildCapability::iter().collect(),
        }
    }

    /// Only the listed capabilities; duplicates are ignored.
    pub fn only(capabilities: impl IntoIterator<Item = ChildCapability>) -> Self {
        let mut kit = Self {
            capabilities: Vec::new(),
        };
        for cap in capabilities {
            if !kit.capabilities.contains(&cap) {
                kit.capabilities.push(cap);
            }
        }
        kit
    }

    pub fn capabilities(&self) -> &[ChildCapability] {
        &self.capabilities
    }

    pub fn tool_set(&self) -> ToolSet {
        self.capabilities.iter().map(|cap| cap.tool()).collect()
    }
}

impl Default for ChildToolKit {
    fn default() -> Self {
        Self::full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_kit_matches_capability_names() {
        let tools = ChildToolKit::full().tool_set();
        let names: Vec<String> = ChildCapability::iter().map(|c| c.to_string()).collect();
        assert_eq!(tools.names(), names.iter().map(String::as_str).collect::<Vec<_>>());
        assert!(!tools.contains("delegate"));
    }

    #[test]
    fn only_dedups() {
        let kit = ChildToolKit::only([ChildCapability::Grep, ChildCapability::Grep]);
        assert_eq!(kit.capabilities(), &[ChildCapability::Grep]);
    }
}
