//! Typed access to tool call arguments.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SkeinError;

/// A tool call's arguments, owned by the handler.
///
/// Handlers get their own copy, so nothing they do can reach back into the
/// [`ToolCall`](crate::types::ToolCall) recorded in history.
#[derive(Debug, Clone)]
pub struct ToolArguments {
    value: Value,
}

impl ToolArguments {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn raw(&self) -> &Value {
        &self.value
    }

    /// Required string argument.
    pub fn get_str(&self, key: &str) -> Result<&str, SkeinError> {
        required(key, "string", self.get_str_opt(key))
    }

    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key)?.as_str()
    }

    /// Required integer argument.
    pub fn get_i64(&self, key: &str) -> Result<i64, SkeinError> {
        required(key, "integer", self.get_i64_opt(key))
    }

    pub fn get_i64_opt(&self, key: &str) -> Option<i64> {
        self.value.get(key)?.as_i64()
    }

    /// Required boolean argument.
    pub fn get_bool(&self, key: &str) -> Result<bool, SkeinError> {
        required(key, "boolean", self.get_bool_opt(key))
    }

    pub fn get_bool_opt(&self, key: &str) -> Option<bool> {
        self.value.get(key)?.as_bool()
    }

    /// Decode the whole argument object into `T`.
    ///
    /// Some models send the arguments as a JSON-encoded string; that string
    /// is parsed first. A blank string counts as `{}`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, SkeinError> {
        let value = match &self.value {
            Value::String(raw) if raw.trim().is_empty() => Value::Object(Default::default()),
            Value::String(raw) => serde_json::from_str(raw.trim()).map_err(decode_error)?,
            other => other.clone(),
        };
        serde_json::from_value(value).map_err(decode_error)
    }
}

fn required<T>(key: &str, kind: &str, value: Option<T>) -> Result<T, SkeinError> {
    value.ok_or_else(|| SkeinError::InvalidArgument(format!("Missing {kind} argument: {key}")))
}

fn decode_error(e: serde_json::Error) -> SkeinError {
    SkeinError::InvalidArgument(format!("Failed to deserialize arguments: {e}"))
}
