//! OpenAI Chat Completions API provider.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::SkeinError;
use crate::types::{Message, Role, ToolCall, Usage};

use super::http::{bearer_headers, shared_client, status_to_error};
use super::{FinishReason, ModelProvider, ProviderRequest, ProviderResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Non-streaming client for any OpenAI-compatible `/chat/completions`
/// endpoint.
pub struct OpenAiChatProvider {
    model: String,
    api_key: String,
    base_url: String,
}

impl OpenAiChatProvider {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>, base_url: Option<String>) -> Self {
        Self {
            model: model.into(),
            api_key: api_key.into(),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    fn build_request_body(&self, request: &ProviderRequest) -> Value {
        let messages: Vec<Value> = request.messages.iter().flat_map(message_to_openai).collect();

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
        });

        if !request.tools.is_empty() {
            let tool_defs: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tool_defs);
        }

        body
    }
}

#[async_trait]
impl ModelProvider for OpenAiChatProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ProviderRequest) -> Result<ProviderResponse, SkeinError> {
        let body = self.build_request_body(request);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "OpenAI complete"
        );

        let resp = shared_client()
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let data: OpenAiChatResponse = resp.json().await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SkeinError::api(status, "No choices in OpenAI response"))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                let arguments = if tc.function.arguments.trim().is_empty() {
                    json!({})
                } else {
                    serde_json::from_str(&tc.function.arguments)
                        .unwrap_or(Value::String(tc.function.arguments))
                };
                ToolCall::new(tc.id, tc.function.name, arguments)
            })
            .collect();

        Ok(ProviderResponse {
            text: choice.message.content.unwrap_or_default(),
            usage: data
                .usage
                .map(|u| Usage {
                    input_tokens: u.prompt_tokens,
                    output_tokens: u.completion_tokens,
                    total_tokens: u.total_tokens,
                    ..Default::default()
                })
                .unwrap_or_default(),
            tool_calls,
            finish_reason: choice.finish_reason.as_deref().and_then(|r| r.parse().ok()),
        })
    }
}

/// Map one history message to wire messages. A tool message fans out into
/// one wire message per result.
fn message_to_openai(msg: &Message) -> Vec<Value> {
    match msg.role {
        Role::Tool => msg
            .tool_results()
            .iter()
            .map(|r| {
                json!({
                    "role": "tool",
                    "tool_call_id": r.tool_call_id,
                    "content": r.text(),
                })
            })
            .collect(),
        Role::Assistant if msg.has_tool_calls() => {
            let calls: Vec<Value> = msg
                .tool_calls()
                .iter()
                .map(|tc| {
                    json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.name,
                            "arguments": tc.arguments.to_string(),
                        }
                    })
                })
                .collect();
            let text = msg.text();
            vec![json!({
                "role": "assistant",
                "content": if text.is_empty() { Value::Null } else { Value::String(text) },
                "tool_calls": calls,
            })]
        }
        role => vec![json!({ "role": role.to_string(), "content": msg.text() })],
    }
}

// OpenAI API response types (internal)

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Deserialize)]
struct OpenAiToolCall {
    id: String,
    function: OpenAiFunction,
}

#[derive(Deserialize)]
struct OpenAiFunction {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolResult;

    #[test]
    fn tool_messages_fan_out_per_result() {
        let a = ToolCall::new("a", "read_file", json!({"path": "x"}));
        let b = ToolCall::new("b", "grep", json!({"pattern": "y"}));
        let msg = Message::tool(vec![
            ToolResult::success(&a, json!("one")),
            ToolResult::error(&b, "bad"),
        ]);

        let wire = message_to_openai(&msg);
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0]["tool_call_id"], "a");
        assert_eq!(wire[1]["content"], "bad");
    }

    #[test]
    fn assistant_tool_calls_are_stringified() {
        let call = ToolCall::new("a", "shell", json!({"command": "ls"}));
        let msg = Message::assistant_reply("", vec![call], None);
        let wire = message_to_openai(&msg);
        assert_eq!(wire[0]["content"], Value::Null);
        assert_eq!(
            wire[0]["tool_calls"][0]["function"]["arguments"],
            r#"{"command":"ls"}"#
        );
    }

    #[test]
    fn request_body_omits_empty_tools() {
        let provider = OpenAiChatProvider::new("gpt-test", "k", Some("http://x/v1/".into()));
        let body = provider.build_request_body(&ProviderRequest {
            messages: vec![Message::system("sys"), Message::user("hi")],
            tools: Vec::new(),
        });
        assert!(body.get("tools").is_none());
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(provider.base_url, "http://x/v1");
    }
}
