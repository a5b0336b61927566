//! The tool loop driving the built-in coding tools on a real directory.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use skein::agent::AgentProfile;
use skein::agent_loop::{LoopRunner, TurnMode};
use skein::provider::{ProviderResponse, ScriptedProvider};
use skein::tools::builtin::coding_tools;
use skein::tools::ToolExecutionContext;
use skein::types::ToolCall;

#[tokio::test]
async fn parallel_calls_edit_the_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("lib.rs"), "fn old() {}\n").unwrap();

    let provider = ScriptedProvider::new([
        ProviderResponse::tool_calls(vec![
            ToolCall::new("c1", "create_file", json!({"path": "notes.md", "content": "# notes\n"})),
            ToolCall::new(
                "c2",
                "edit_file",
                json!({"path": "lib.rs", "old_string": "old", "new_string": "renamed"}),
            ),
            ToolCall::new("c3", "glob", json!({"pattern": "*.rs"})),
        ]),
        ProviderResponse::text("Done."),
    ]);
    let runner = LoopRunner::new(Arc::new(provider.clone()));
    let agent = AgentProfile::default().build(coding_tools()).append("tidy up");

    let outcome = runner
        .run_turn(
            agent,
            &TurnMode::WhileNeedsResponse,
            &ToolExecutionContext::new(dir.path()),
        )
        .await
        .unwrap();

    let results = outcome.agent.messages()[3].tool_results();
    let ids: Vec<&str> = results.iter().map(|r| r.tool_call_id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c2", "c3"]);
    assert!(results.iter().all(|r| !r.is_error), "{results:?}");

    assert_eq!(
        std::fs::read_to_string(dir.path().join("notes.md")).unwrap(),
        "# notes\n"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("lib.rs")).unwrap(),
        "fn renamed() {}\n"
    );
    assert_eq!(outcome.agent.last_assistant_text().as_deref(), Some("Done."));
}

#[tokio::test]
async fn tool_errors_are_fed_back_to_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new([
        common::call("c1", "read_file", json!({"path": "missing.txt"})),
        ProviderResponse::text("That file does not exist."),
    ]);
    let runner = LoopRunner::new(Arc::new(provider.clone()));
    let agent = AgentProfile::default().build(coding_tools()).append("read it");

    let outcome = runner
        .run_turn(
            agent,
            &TurnMode::WhileNeedsResponse,
            &ToolExecutionContext::new(dir.path()),
        )
        .await
        .unwrap();

    let result = &outcome.agent.messages()[3].tool_results()[0];
    assert!(result.is_error);
    assert!(result.text().contains("missing.txt"), "{}", result.text());

    // The model saw the error text on its second call.
    let second = &provider.requests()[1];
    assert!(second.messages[3].tool_results()[0].is_error);
}
