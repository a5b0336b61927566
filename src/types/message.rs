//! Message types exchanged between the user, the model and tools.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::usage::Usage;

/// A message in a conversation.
///
/// The constructors keep the role/field pairing intact: only assistant
/// messages carry `tool_calls` and only tool messages carry `tool_results`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ContentPart>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_results: Option<Vec<ToolResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    fn with_role(role: Role) -> Self {
        Self {
            role,
            content: None,
            tool_calls: None,
            tool_results: None,
            metadata: None,
            timestamp: Some(Utc::now()),
        }
    }

    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            content: Some(vec![ContentPart::text(text)]),
            ..Self::with_role(Role::System)
        }
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            content: Some(vec![ContentPart::text(text)]),
            ..Self::with_role(Role::User)
        }
    }

    /// Create a plain-text assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            content: Some(vec![ContentPart::text(text)]),
            ..Self::with_role(Role::Assistant)
        }
    }

    /// Create an assistant message from a provider reply.
    ///
    /// Empty text yields `content: None`; an empty call list yields
    /// `tool_calls: None`.
    pub fn assistant_reply(
        text: impl Into<String>,
        tool_calls: Vec<ToolCall>,
        usage: Option<Usage>,
    ) -> Self {
        let text = text.into();
        Self {
            content: (!text.is_empty()).then(|| vec![ContentPart::Text { text }]),
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            metadata: usage.map(|usage| MessageMetadata { usage }),
            ..Self::with_role(Role::Assistant)
        }
    }

    /// Wrap the results of one tool round into a single tool message.
    pub fn tool(results: Vec<ToolResult>) -> Self {
        Self {
            tool_results: Some(results),
            ..Self::with_role(Role::Tool)
        }
    }

    /// Concatenate all text parts.
    pub fn text(&self) -> String {
        self.content
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter_map(ContentPart::as_text)
            .collect::<Vec<_>>()
            .join("")
    }

    /// Tool calls requested by this message (empty unless assistant).
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }

    /// Tool results carried by this message (empty unless tool).
    pub fn tool_results(&self) -> &[ToolResult] {
        self.tool_results.as_deref().unwrap_or_default()
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls().is_empty()
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }

    /// Usage recorded by the provider for this message, if any.
    pub fn usage(&self) -> Option<&Usage> {
        self.metadata.as_ref().map(|m| &m.usage)
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::user(text)
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::user(text)
    }
}

/// Conversation role.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single part of message content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Json { value: serde_json::Value },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Render a tool output value: strings stay verbatim, anything else
    /// becomes structured JSON content.
    pub fn from_value(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(text) => Self::Text { text },
            value => Self::Json { value },
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Json { .. } => None,
        }
    }

    /// Text rendering used when content has to be flattened to a string.
    pub fn to_plain_text(&self) -> String {
        match self {
            Self::Text { text } => text.clone(),
            Self::Json { value } => value.to_string(),
        }
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// The outcome of dispatching one [`ToolCall`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub name: String,
    pub content: Vec<ContentPart>,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(call: &ToolCall, value: serde_json::Value) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            content: vec![ContentPart::from_value(value)],
            is_error: false,
        }
    }

    pub fn error(call: &ToolCall, message: impl Into<String>) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            content: vec![ContentPart::text(message)],
            is_error: true,
        }
    }

    /// Flatten the content parts into a single string.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(ContentPart::to_plain_text)
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Per-message metadata reported by the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MessageMetadata {
    pub usage: Usage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_text_becomes_user_message() {
        let msg: Message = "list files".into();
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text(), "list files");
        assert!(msg.tool_calls.is_none());
        assert!(msg.tool_results.is_none());
    }

    #[test]
    fn assistant_reply_omits_empty_parts() {
        let msg = Message::assistant_reply("", vec![ToolCall::new("1", "shell", json!({}))], None);
        assert!(msg.content.is_none());
        assert_eq!(msg.tool_calls().len(), 1);

        let msg = Message::assistant_reply("hi", Vec::new(), Some(Usage::default()));
        assert!(msg.tool_calls.is_none());
        assert!(msg.usage().is_some());
    }

    #[test]
    fn tool_result_keeps_string_output_verbatim() {
        let call = ToolCall::new("c1", "report", json!({}));
        let result = ToolResult::success(&call, json!("summary: done"));
        assert_eq!(result.text(), "summary: done");
        assert_eq!(result.name, "report");

        let result = ToolResult::success(&call, json!({"count": 2}));
        assert_eq!(result.text(), r#"{"count":2}"#);
    }

    #[test]
    fn role_round_trips_through_strum() {
        assert_eq!(Role::Assistant.to_string(), "assistant");
        assert_eq!("tool".parse::<Role>().ok(), Some(Role::Tool));
    }
}
