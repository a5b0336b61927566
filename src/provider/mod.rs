//! Model provider trait and implementations.

pub mod http;
pub mod openai;
pub mod scripted;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::SkeinError;
use crate::tools::ToolDefinition;
use crate::types::{Message, ToolCall, Usage};

pub use openai::OpenAiChatProvider;
pub use scripted::ScriptedProvider;

/// A request sent to a model provider: the full history plus tool schemas.
#[derive(Debug, Clone, Default)]
pub struct ProviderRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
}

/// Response from a provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderResponse {
    pub text: String,
    pub usage: Usage,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<FinishReason>,
}

impl ProviderResponse {
    /// A plain text reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finish_reason: Some(FinishReason::Stop),
            ..Default::default()
        }
    }

    /// A reply that requests tool calls.
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            finish_reason: Some(FinishReason::ToolCalls),
            ..Default::default()
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }

    /// Convert into the assistant message appended to history.
    pub fn into_message(self) -> Message {
        let usage = (self.usage != Usage::default()).then_some(self.usage);
        Message::assistant_reply(self.text, self.tool_calls, usage)
    }
}

/// Core trait implemented by all model providers.
///
/// The loop treats a provider as "history plus tool schemas in, one
/// assistant reply out".
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name (e.g., "openai").
    fn provider_name(&self) -> &str;

    /// The model ID this provider instance serves.
    fn model_id(&self) -> &str;

    /// Generate one assistant reply (non-streaming).
    async fn complete(&self, request: &ProviderRequest) -> Result<ProviderResponse, SkeinError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_usage_is_not_recorded() {
        let msg = ProviderResponse::text("hi").into_message();
        assert!(msg.usage().is_none());
        assert_eq!(msg.text(), "hi");

        let msg = ProviderResponse::text("hi")
            .with_usage(Usage {
                input_tokens: 3,
                output_tokens: 1,
                total_tokens: 4,
                ..Default::default()
            })
            .into_message();
        assert_eq!(msg.usage().map(|u| u.total_tokens), Some(4));
    }

    #[test]
    fn finish_reason_parses_wire_names() {
        assert_eq!("tool_calls".parse::<FinishReason>().ok(), Some(FinishReason::ToolCalls));
        assert!("unknown".parse::<FinishReason>().is_err());
    }
}
