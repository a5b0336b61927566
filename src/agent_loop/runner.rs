//! The model/tool alternation that drives one turn.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::agent::{Agent, AgentStatus};
use crate::provider::{ModelProvider, ProviderRequest};
use crate::tools::ToolExecutionContext;
use crate::types::Message;

use super::limits::LoopLimits;
use super::tooling::dispatch_tool_calls;
use super::types::{StopReason, TurnError, TurnFailure, TurnMode, TurnOutcome};

/// Runs turns against one provider.
#[derive(Clone)]
pub struct LoopRunner {
    provider: Arc<dyn ModelProvider>,
    limits: LoopLimits,
}

impl LoopRunner {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            provider,
            limits: LoopLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: LoopLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> LoopLimits {
        self.limits
    }

    pub fn provider(&self) -> &Arc<dyn ModelProvider> {
        &self.provider
    }

    /// Alternate model calls and tool rounds until `mode` says stop.
    ///
    /// Every assistant reply and every tool round is appended to the
    /// agent's history, including on failure.
    pub async fn run_turn(
        &self,
        mut agent: Agent,
        mode: &TurnMode,
        ctx: &ToolExecutionContext,
    ) -> Result<TurnOutcome, TurnError> {
        agent.set_status(AgentStatus::Running);
        let tools = agent.tools().definitions();

        for iteration in 1..=self.limits.max_iterations {
            let request = ProviderRequest {
                messages: agent.messages().to_vec(),
                tools: tools.clone(),
            };
            debug!(
                agent = %agent.identity(),
                iteration,
                messages = request.messages.len(),
                provider = self.provider.provider_name(),
                "requesting model reply"
            );

            let response = match self.provider.complete(&request).await {
                Ok(response) => response,
                Err(err) => return Err(fail(agent, TurnFailure::Provider, err.to_string())),
            };

            let calls = response.tool_calls.clone();
            agent.push(response.into_message());

            if calls.is_empty() {
                if matches!(mode, TurnMode::UntilToolUsed(_)) {
                    continue;
                }
                agent.set_status(AgentStatus::Idle);
                return Ok(TurnOutcome {
                    agent,
                    stop: StopReason::Completed,
                });
            }

            debug!(
                agent = %agent.identity(),
                iteration,
                tool_calls = calls.len(),
                "dispatching tools"
            );
            let results = match dispatch_tool_calls(agent.tools(), &calls, ctx).await {
                Ok(results) => results,
                Err(reason) => return Err(fail(agent, TurnFailure::Tool, reason)),
            };

            let sentinel = match mode {
                TurnMode::UntilToolUsed(target) => results
                    .iter()
                    .find(|r| r.name == *target && !r.is_error)
                    .cloned(),
                _ => None,
            };

            agent.push(Message::tool(results));

            if let Some(result) = sentinel {
                agent.set_status(AgentStatus::Idle);
                return Ok(TurnOutcome {
                    agent,
                    stop: StopReason::ToolUsed(result),
                });
            }
        }

        Err(fail(
            agent,
            TurnFailure::IterationLimit,
            format!(
                "tool loop exceeded max iterations ({})",
                self.limits.max_iterations
            ),
        ))
    }
}

fn fail(mut agent: Agent, kind: TurnFailure, reason: String) -> TurnError {
    warn!(agent = %agent.identity(), ?kind, %reason, "turn failed");
    agent.set_status(AgentStatus::Failed);
    TurnError {
        agent,
        kind,
        reason,
    }
}

impl std::fmt::Debug for LoopRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopRunner")
            .field("provider", &self.provider.provider_name())
            .field("model", &self.provider.model_id())
            .field("limits", &self.limits)
            .finish()
    }
}
