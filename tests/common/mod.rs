//! Shared test helpers.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use skein::bus::{Notification, Subscription};
use skein::provider::{ProviderResponse, ScriptedProvider};
use skein::thread::{ThreadManager, ThreadManagerOptions};
use skein::types::ToolCall;

pub const WAIT: Duration = Duration::from_secs(5);

/// A reply requesting a single tool call.
pub fn call(id: &str, name: &str, args: Value) -> ProviderResponse {
    ProviderResponse::tool_calls(vec![ToolCall::new(id, name, args)])
}

/// A manager driven by `provider` whose threads default to `dir`.
pub fn manager(provider: &ScriptedProvider, dir: &std::path::Path) -> ThreadManager {
    ThreadManager::start(
        ThreadManagerOptions::builder()
            .provider(Arc::new(provider.clone()))
            .default_working_dir(dir.to_path_buf())
            .build(),
    )
}

/// Wait for the next notification, failing the test after [`WAIT`].
pub async fn next(sub: &mut Subscription) -> Notification {
    tokio::time::timeout(WAIT, sub.recv())
        .await
        .expect("timed out waiting for notification")
        .expect("bus closed")
}
