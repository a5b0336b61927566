//! Concurrent dispatch of one round of tool calls.

use std::sync::Arc;

use futures::future;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::SkeinError;
use crate::tools::{
    validate_arguments, ExecutionMode, Tool, ToolArguments, ToolExecutionContext, ToolSet,
};
use crate::types::{ToolCall, ToolResult};

/// Run every call concurrently and collect results in call order.
///
/// Handler errors become error results. A fatal tool fault or a panicking
/// handler fails the whole round with a reason string.
pub(super) async fn dispatch_tool_calls(
    tools: &ToolSet,
    calls: &[ToolCall],
    ctx: &ToolExecutionContext,
) -> Result<Vec<ToolResult>, String> {
    let handles: Vec<_> = calls
        .iter()
        .map(|call| spawn_tool_call(tools.get(&call.name).cloned(), call.clone(), ctx.clone()))
        .collect();

    let joined = future::join_all(handles).await;

    let mut results = Vec::with_capacity(calls.len());
    for (call, outcome) in calls.iter().zip(joined) {
        match outcome {
            Ok(Ok(result)) => results.push(result),
            Ok(Err(fault)) => return Err(fault.to_string()),
            Err(join_err) if join_err.is_panic() => {
                return Err(format!("tool '{}' panicked", call.name));
            }
            Err(join_err) => {
                return Err(format!("tool '{}' did not finish: {join_err}", call.name));
            }
        }
    }
    Ok(results)
}

fn spawn_tool_call(
    tool: Option<Arc<dyn Tool>>,
    call: ToolCall,
    ctx: ToolExecutionContext,
) -> JoinHandle<Result<ToolResult, SkeinError>> {
    match tool.as_ref().map(|t| t.mode()) {
        Some(ExecutionMode::Sync) => {
            let handle = Handle::current();
            tokio::task::spawn_blocking(move || handle.block_on(execute_tool_call(tool, call, ctx)))
        }
        _ => tokio::spawn(execute_tool_call(tool, call, ctx)),
    }
}

async fn execute_tool_call(
    tool: Option<Arc<dyn Tool>>,
    call: ToolCall,
    ctx: ToolExecutionContext,
) -> Result<ToolResult, SkeinError> {
    let Some(tool) = tool else {
        debug!(tool = %call.name, "unknown tool requested");
        return Ok(ToolResult::error(&call, format!("Tool '{}' not found", call.name)));
    };

    if let Err(validation_error) = validate_arguments(&call.arguments, &tool.parameters().schema) {
        return Ok(ToolResult::error(
            &call,
            format!("Argument validation failed: {validation_error}"),
        ));
    }

    let args = ToolArguments::new(call.arguments.clone());
    let ctx = ToolExecutionContext {
        tool_call_id: Some(call.id.clone()),
        ..ctx
    };

    match tool.execute(&args, &ctx).await {
        Ok(value) => Ok(ToolResult::success(&call, value)),
        Err(err) if err.is_fatal_tool_error() => Err(err),
        Err(err) => {
            debug!(tool = %call.name, error = %err, "tool returned an error");
            Ok(ToolResult::error(&call, err.to_string()))
        }
    }
}
