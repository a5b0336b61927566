//! Sub-agent delegation through a scripted provider.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use skein::agent::AgentProfile;
use skein::agent_loop::LoopLimits;
use skein::bus::Notification;
use skein::delegation::{DelegationRequest, Delegator, DELEGATE_TOOL_NAME, DELEGATION_PROMPT};
use skein::error::DelegationError;
use skein::provider::{ProviderResponse, ScriptedProvider};
use skein::tools::ToolExecutionContext;
use skein::types::Role;

use common::{call, manager, next};

fn request() -> DelegationRequest {
    DelegationRequest::builder()
        .description("Count the files")
        .plan("List the directory and count entries")
        .build()
}

fn delegator(provider: &ScriptedProvider) -> Delegator {
    Delegator::new(Arc::new(provider.clone()), AgentProfile::default())
}

#[tokio::test]
async fn report_call_ends_the_child_run() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new([call("r1", "report", json!({"summary": "done"}))]);

    let report = delegator(&provider)
        .delegate(request(), &ToolExecutionContext::new(dir.path()))
        .await
        .unwrap();
    assert_eq!(report, "summary: done");

    // One call: the child stops right after the report result.
    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].messages[0].text(), DELEGATION_PROMPT);
    assert!(requests[0].messages[1].text().contains("Count the files"));
}

#[tokio::test]
async fn child_tools_exclude_delegate() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new([call("r1", "report", json!({"summary": "ok"}))]);

    delegator(&provider)
        .delegate(request(), &ToolExecutionContext::new(dir.path()))
        .await
        .unwrap();

    let names: Vec<String> = provider.requests()[0]
        .tools
        .iter()
        .map(|t| t.name.clone())
        .collect();
    assert!(names.iter().any(|n| n == "report"));
    assert!(names.iter().any(|n| n == "shell"));
    assert!(!names.iter().any(|n| n == DELEGATE_TOOL_NAME));
}

#[tokio::test]
async fn missing_report_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new([]).repeating(ProviderResponse::text("still thinking"));

    let err = delegator(&provider)
        .with_limits(LoopLimits::new(3))
        .delegate(request(), &ToolExecutionContext::new(dir.path()))
        .await
        .unwrap_err();
    assert_eq!(err, DelegationError::ReportNotFound);
    assert_eq!(provider.requests().len(), 3);
}

#[tokio::test]
async fn bad_report_arguments_let_the_child_retry() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new([
        call("r1", "report", json!({})),
        call("r2", "report", json!({"summary": "fixed", "artifacts": ["a.rs", "b.rs"]})),
    ]);

    let report = delegator(&provider)
        .delegate(request(), &ToolExecutionContext::new(dir.path()))
        .await
        .unwrap();
    assert_eq!(report, "summary: fixed\nartifacts: a.rs, b.rs");
}

#[tokio::test]
async fn provider_failure_surfaces_as_run_error() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new([]);
    provider.push_error("quota exceeded");

    let err = delegator(&provider)
        .delegate(request(), &ToolExecutionContext::new(dir.path()))
        .await
        .unwrap_err();
    assert!(matches!(err, DelegationError::Run(ref reason) if reason.contains("quota exceeded")));
}

#[tokio::test]
async fn parent_receives_child_report_as_tool_result() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::from_fn(|request| {
        let is_child = request
            .messages
            .first()
            .is_some_and(|m| m.text() == DELEGATION_PROMPT);
        let last = request.messages.last().expect("history is never empty");

        if is_child {
            return Ok(call("c1", "report", json!({"summary": "child done"})));
        }
        match last.role {
            Role::Tool => Ok(ProviderResponse::text(format!(
                "child said: {}",
                last.tool_results()[0].text()
            ))),
            _ => Ok(call(
                "p1",
                DELEGATE_TOOL_NAME,
                json!({"description": "Summarise", "plan": "Read and report"}),
            )),
        }
    });
    let manager = manager(&provider, dir.path());
    let name = manager.start_thread(None, None).await.unwrap();
    let mut updates = manager.subscribe(&name);

    manager.send_message(&name, "Please delegate this").await.unwrap();

    let Notification::Updated { agent, .. } = next(&mut updates).await else {
        panic!("expected an update");
    };
    assert_eq!(
        agent.last_assistant_text().as_deref(),
        Some("child said: summary: child done")
    );
    // The child's history never leaks into the parent.
    assert_eq!(agent.messages().len(), 5);
}
