//! Error types for skein.

use thiserror::Error;

/// Primary error type for skein operations.
#[derive(Error, Debug)]
pub enum SkeinError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    /// A tool hit a fault it cannot report back to the model; aborts the turn.
    #[error("Unrecoverable tool fault: {tool_name}: {message}")]
    ToolFault { tool_name: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Provider error: {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Turn failed: {0}")]
    Turn(String),

    #[error(transparent)]
    SystemPrompt(#[from] SystemPromptError),

    #[error(transparent)]
    Thread(#[from] ThreadError),

    #[error(transparent)]
    Delegation(#[from] DelegationError),
}

impl SkeinError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Network(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }

    /// Whether a tool failure must abort the whole turn instead of being
    /// fed back to the model.
    pub fn is_fatal_tool_error(&self) -> bool {
        matches!(self, Self::ToolFault { .. })
    }
}

/// Failure modes of [`crate::agent::Agent::replace_system_prompt`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemPromptError {
    #[error("conversation has no system message to replace")]
    NoSystemMessage,

    #[error("conversation has more than one system message")]
    MultipleSystemMessages,

    #[error("replacement message is not a system message")]
    NotASystemMessage,
}

/// Errors surfaced by the thread manager.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThreadError {
    #[error("thread not found: {0}")]
    NotFound(String),

    #[error("invalid working directory {path}: {reason}")]
    InvalidWorkingDir { path: String, reason: String },

    #[error("thread manager is not running")]
    ManagerStopped,
}

/// Errors surfaced by sub-agent delegation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DelegationError {
    /// The child conversation ended without calling its sentinel tool.
    #[error("report result not found")]
    ReportNotFound,

    #[error("delegated run failed: {0}")]
    Run(String),

    #[error("invalid delegation request: {0}")]
    InvalidRequest(String),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SkeinError>;
