//! Single-level sub-agent delegation.

use std::sync::Arc;

use async_trait::async_trait;
use bon::Builder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::agent::{Agent, AgentProfile};
use crate::agent_loop::{LoopLimits, LoopRunner, TurnFailure, TurnMode};
use crate::error::{DelegationError, SkeinError};
use crate::provider::ModelProvider;
use crate::tools::{Tool, ToolArguments, ToolExecutionContext, ToolParameters, ToolSet};
use crate::types::{Message, Role};

use super::kit::ChildToolKit;
use super::report::{report_tool, REPORT_TOOL_NAME};

pub const DELEGATE_TOOL_NAME: &str = "delegate";

/// Instructions that replace the profile's system prompt in a child
/// conversation.
pub const DELEGATION_PROMPT: &str = "\
You are a focused sub-agent working on one delegated task inside a project directory. \
Follow the plan you are given, using the file and shell tools available to you. \
You cannot delegate further. \
When the task is complete, or you cannot make further progress, call the `report` tool \
exactly once with a short summary, any relevant details, the files you touched as \
artifacts, and suggested followups. Your work is only returned to the caller through \
`report`.";

/// A unit of work handed to a child conversation.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
pub struct DelegationRequest {
    #[builder(into)]
    pub description: String,
    #[builder(into)]
    pub plan: String,
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<String>,
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_context: Option<String>,
}

impl DelegationRequest {
    fn validate(&self) -> Result<(), DelegationError> {
        if self.description.trim().is_empty() {
            return Err(DelegationError::InvalidRequest("description is empty".into()));
        }
        if self.plan.trim().is_empty() {
            return Err(DelegationError::InvalidRequest("plan is empty".into()));
        }
        Ok(())
    }

    /// The single user message that opens the child conversation.
    pub fn to_prompt(&self) -> String {
        let mut prompt = format!("Task:\n{}\n\nPlan:\n{}", self.description, self.plan);
        if let Some(verification) = self.verification.as_deref().filter(|v| !v.trim().is_empty()) {
            prompt.push_str(&format!("\n\nVerification:\n{verification}"));
        }
        if let Some(context) = self.extra_context.as_deref().filter(|c| !c.trim().is_empty()) {
            prompt.push_str(&format!("\n\nAdditional context:\n{context}"));
        }
        prompt
    }
}

/// Runs delegated tasks in fresh, restricted child conversations.
#[derive(Debug, Clone)]
pub struct Delegator {
    runner: LoopRunner,
    profile: AgentProfile,
    kit: ChildToolKit,
}

impl Delegator {
    pub fn new(provider: Arc<dyn ModelProvider>, profile: AgentProfile) -> Self {
        Self {
            runner: LoopRunner::new(provider).with_limits(LoopLimits::delegation()),
            profile,
            kit: ChildToolKit::full(),
        }
    }

    pub fn with_limits(mut self, limits: LoopLimits) -> Self {
        self.runner = self.runner.with_limits(limits);
        self
    }

    pub fn with_kit(mut self, kit: ChildToolKit) -> Self {
        self.kit = kit;
        self
    }

    /// Build the child agent for `request` without running it.
    pub fn child_agent(&self, request: &DelegationRequest) -> Result<Agent, DelegationError> {
        request.validate()?;
        let tools = self.kit.tool_set().with(report_tool());
        let child = self
            .profile
            .build(tools)
            .replace_system_prompt(Message::system(DELEGATION_PROMPT))
            .map_err(|e| DelegationError::Run(e.to_string()))?;
        Ok(child.append(request.to_prompt()))
    }

    /// Run `request` to completion and return the child's report.
    pub async fn delegate(
        &self,
        request: DelegationRequest,
        ctx: &ToolExecutionContext,
    ) -> Result<String, DelegationError> {
        let child = self.child_agent(&request)?;
        info!(
            task = %request.description,
            max_iterations = self.runner.limits().max_iterations,
            "delegating task"
        );

        let mode = TurnMode::until_tool_used(REPORT_TOOL_NAME);
        let agent = match self.runner.run_turn(child, &mode, ctx).await {
            Ok(outcome) => outcome.agent,
            Err(err) if err.kind == TurnFailure::IterationLimit => err.agent,
            Err(err) => return Err(DelegationError::Run(err.reason)),
        };

        let report = find_report(&agent).ok_or(DelegationError::ReportNotFound)?;
        debug!(messages = agent.messages().len(), "delegated task reported");
        Ok(report)
    }
}

/// The text of the most recent successful `report` result.
pub fn find_report(agent: &Agent) -> Option<String> {
    agent
        .messages()
        .iter()
        .rev()
        .filter(|m| m.role == Role::Tool)
        .flat_map(|m| m.tool_results().iter())
        .find(|r| r.name == REPORT_TOOL_NAME && !r.is_error)
        .map(|r| r.text())
}

/// Exposes a [`Delegator`] to a parent conversation as the `delegate` tool.
pub struct DelegateTool {
    delegator: Arc<Delegator>,
    parameters: ToolParameters,
}

impl DelegateTool {
    pub fn new(delegator: Arc<Delegator>) -> Self {
        Self {
            delegator,
            parameters: ToolParameters::object()
                .string("description", "What the sub-agent should accomplish", true)
                .string("plan", "Concrete steps the sub-agent should follow", true)
                .string("verification", "How the sub-agent should check its work", false)
                .string("extra_context", "Anything else the sub-agent needs to know", false)
                .build(),
        }
    }
}

#[async_trait]
impl Tool for DelegateTool {
    fn name(&self) -> &str {
        DELEGATE_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Hand a self-contained task to a sub-agent with file and shell tools; returns its report"
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value, SkeinError> {
        let request: DelegationRequest = args.deserialize()?;
        self.delegator
            .delegate(request, ctx)
            .await
            .map(serde_json::Value::String)
            .map_err(|e| SkeinError::ToolExecution {
                tool_name: DELEGATE_TOOL_NAME.into(),
                message: e.to_string(),
            })
    }
}

/// The full parent tool set: every built-in coding tool plus `delegate`.
pub fn parent_tools(delegator: Arc<Delegator>) -> ToolSet {
    crate::tools::builtin::coding_tools().with(Arc::new(DelegateTool::new(delegator)))
}
