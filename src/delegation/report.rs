//! The `report` sentinel tool a delegated conversation ends with.

use std::sync::Arc;

use serde_json::Value;

use crate::tools::{AgentTool, Tool, ToolArguments, ToolParameters};

pub const REPORT_TOOL_NAME: &str = "report";

const REPORT_FIELDS: [&str; 4] = ["summary", "details", "artifacts", "followups"];

/// Create the `report` tool.
///
/// Its output is the delegation's return value: one `key: value` line per
/// non-empty field, in schema order.
pub fn report_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        REPORT_TOOL_NAME,
        "Finish the delegated task and report the result to the parent agent",
        ToolParameters::object()
            .string("summary", "One or two sentences describing the outcome", true)
            .string("details", "Relevant details, findings or caveats", false)
            .string_array("artifacts", "Files created or changed", false)
            .string_array("followups", "Work left for the parent to consider", false)
            .build(),
        |args, _| async move { Ok(Value::String(render_report(&args))) },
    ))
}

pub(crate) fn render_report(args: &ToolArguments) -> String {
    REPORT_FIELDS
        .iter()
        .filter_map(|key| {
            let rendered = match args.raw().get(*key)? {
                Value::String(s) => s.trim().to_string(),
                Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (!rendered.is_empty()).then(|| format!("{key}: {rendered}"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
