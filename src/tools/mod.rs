//! Tool system for function calling.

pub mod arguments;
pub mod builtin;
pub mod registry;
pub mod tool;
pub mod types;
pub mod validation;

pub use arguments::ToolArguments;
pub use registry::{ToolDefinition, ToolSet};
pub use tool::{AgentTool, ExecutionMode, Tool, ToolExecutionContext};
pub use types::{ParameterBuilder, ToolParameters};
pub use validation::validate_arguments;
