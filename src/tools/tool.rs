//! Tool trait and closure-based tool wrapper.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::arguments::ToolArguments;
use super::types::ToolParameters;
use crate::error::SkeinError;

/// How the tool loop schedules a handler.
///
/// `Async` handlers are polled on their own task. `Sync` handlers may block
/// and are moved onto the blocking pool so they never stall sibling calls.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExecutionMode {
    Sync,
    #[default]
    Async,
}

/// Context available during tool execution.
#[derive(Debug, Clone, Default)]
pub struct ToolExecutionContext {
    /// Directory that relative tool paths resolve against.
    pub working_dir: PathBuf,
    /// Id of the call being executed; set by the dispatcher.
    pub tool_call_id: Option<String>,
}

impl ToolExecutionContext {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            ..Default::default()
        }
    }

    /// Resolve `path` against the working directory. Absolute paths pass
    /// through untouched.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() || self.working_dir.as_os_str().is_empty() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}

/// Core tool trait -- implement to create custom tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema parameters.
    fn parameters(&self) -> &ToolParameters;

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Async
    }

    /// Execute the tool with parsed arguments.
    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value, SkeinError>;
}

/// Type alias for the tool handler function.
type ToolHandler = dyn Fn(
        ToolArguments,
        ToolExecutionContext,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, SkeinError>> + Send>>
    + Send
    + Sync;

/// Closure-based tool for quick tool creation.
pub struct AgentTool {
    name: String,
    description: String,
    parameters: ToolParameters,
    mode: ExecutionMode,
    handler: Arc<ToolHandler>,
}

impl AgentTool {
    /// Create a tool from a closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, SkeinError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            mode: ExecutionMode::Async,
            handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
        }
    }

    /// Override the execution mode (defaults to [`ExecutionMode::Async`]).
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    fn mode(&self) -> ExecutionMode {
        self.mode
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value, SkeinError> {
        (self.handler)(args.clone(), ctx.clone()).await
    }
}

impl std::fmt::Debug for AgentTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentTool")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_joins_relative_paths_only() {
        let ctx = ToolExecutionContext::new("/work");
        assert_eq!(ctx.resolve("src/lib.rs"), PathBuf::from("/work/src/lib.rs"));
        assert_eq!(ctx.resolve("/etc/hosts"), PathBuf::from("/etc/hosts"));
        assert_eq!(
            ToolExecutionContext::default().resolve("a.txt"),
            PathBuf::from("a.txt")
        );
    }

    #[tokio::test]
    async fn closure_tool_defaults_to_async_mode() {
        let tool = AgentTool::new("echo", "echo back", ToolParameters::empty(), |args, _| async move {
            Ok(args.raw().clone())
        });
        assert_eq!(tool.mode(), ExecutionMode::Async);
        let out = tool
            .execute(
                &ToolArguments::new(serde_json::json!({"a": 1})),
                &ToolExecutionContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(out["a"], 1);

        let tool = tool.with_mode(ExecutionMode::Sync);
        assert_eq!(tool.mode(), ExecutionMode::Sync);
    }
}
