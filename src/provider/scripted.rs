//! Deterministic provider that replays a script of replies.
//!
//! Used by tests and demos to drive the tool loop without a network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::SkeinError;

use super::{ModelProvider, ProviderRequest, ProviderResponse};

type Responder = dyn Fn(&ProviderRequest) -> Result<ProviderResponse, SkeinError> + Send + Sync;

enum Step {
    Reply(ProviderResponse),
    Fail(String),
}

/// A provider that returns pre-configured replies in order.
///
/// Once the queue is drained it falls back to the repeating reply (if set),
/// then to the responder closure (if set), and otherwise fails.
#[derive(Clone)]
pub struct ScriptedProvider {
    state: Arc<Mutex<ScriptState>>,
    responder: Option<Arc<Responder>>,
    delay: Option<Duration>,
}

#[derive(Default)]
struct ScriptState {
    steps: VecDeque<Step>,
    repeat: Option<ProviderResponse>,
    requests: Vec<ProviderRequest>,
}

impl ScriptedProvider {
    pub fn new(replies: impl IntoIterator<Item = ProviderResponse>) -> Self {
        let state = ScriptState {
            steps: replies.into_iter().map(Step::Reply).collect(),
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            responder: None,
            delay: None,
        }
    }

    /// Compute every reply from the request.
    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(&ProviderRequest) -> Result<ProviderResponse, SkeinError> + Send + Sync + 'static,
    {
        Self {
            responder: Some(Arc::new(responder)),
            ..Self::new([])
        }
    }

    /// Queue another reply.
    pub fn push(&self, reply: ProviderResponse) -> &Self {
        self.lock().steps.push_back(Step::Reply(reply));
        self
    }

    /// Queue a provider failure.
    pub fn push_error(&self, message: impl Into<String>) -> &Self {
        self.lock().steps.push_back(Step::Fail(message.into()));
        self
    }

    /// Reply with `reply` forever once the queue is empty.
    pub fn repeating(self, reply: ProviderResponse) -> Self {
        self.lock().repeat = Some(reply);
        self
    }

    /// Sleep before every reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.lock().requests.clone()
    }

    pub fn remaining(&self) -> usize {
        self.lock().steps.len()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_step(&self, request: &ProviderRequest) -> Result<ProviderResponse, SkeinError> {
        let mut state = self.lock();
        state.requests.push(request.clone());
        match state.steps.pop_front() {
            Some(Step::Reply(reply)) => return Ok(reply),
            Some(Step::Fail(message)) => {
                return Err(SkeinError::Provider {
                    provider: "scripted".into(),
                    message,
                })
            }
            None => {}
        }
        if let Some(reply) = &state.repeat {
            return Ok(reply.clone());
        }
        drop(state);
        match &self.responder {
            Some(responder) => responder(request),
            None => Err(SkeinError::Provider {
                provider: "scripted".into(),
                message: "script exhausted".into(),
            }),
        }
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ProviderRequest) -> Result<ProviderResponse, SkeinError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.next_step(request)
    }
}
