//! Thread lifecycle: create, look up, message, list and stop threads.
//!
//! A single registrar task owns the name -> worker map, so "create if
//! absent" is atomic. Each thread is its own worker task holding its agent;
//! callers only talk to it through channels.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bon::Builder;
use futures::future;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::agent::{Agent, AgentProfile};
use crate::agent_loop::{LoopLimits, LoopRunner};
use crate::bus::{NotificationBus, Subscription, DEFAULT_BUS_CAPACITY};
use crate::config::{SkeinConfig, DEFAULT_LIST_TIMEOUT_MS, DEFAULT_MAILBOX_CAPACITY};
use crate::delegation::{parent_tools, Delegator};
use crate::error::ThreadError;
use crate::provider::ModelProvider;

use super::names::generate_name;
use super::worker::{
    spawn_worker, ThreadEntry, WorkerClient, WorkerCommand, WorkerHandle, WorkerSettings,
};

const REGISTRAR_CAPACITY: usize = 64;

/// Options for [`ThreadManager::start`].
#[derive(Builder)]
pub struct ThreadManagerOptions {
    provider: Arc<dyn ModelProvider>,
    #[builder(default)]
    profile: AgentProfile,
    #[builder(default)]
    limits: LoopLimits,
    #[builder(default = LoopLimits::delegation())]
    delegation_limits: LoopLimits,
    #[builder(default = DEFAULT_MAILBOX_CAPACITY)]
    mailbox_capacity: usize,
    #[builder(default = DEFAULT_BUS_CAPACITY)]
    bus_capacity: usize,
    #[builder(default = Duration::from_millis(DEFAULT_LIST_TIMEOUT_MS))]
    list_timeout: Duration,
    #[builder(into)]
    default_working_dir: Option<PathBuf>,
}

impl ThreadManagerOptions {
    /// Options derived from a loaded config.
    pub fn from_config(provider: Arc<dyn ModelProvider>, config: &SkeinConfig) -> Self {
        Self {
            provider,
            profile: AgentProfile::default(),
            limits: LoopLimits::new(config.max_iterations),
            delegation_limits: LoopLimits::new(config.delegation_max_iterations),
            mailbox_capacity: config.mailbox_capacity,
            bus_capacity: config.bus_capacity,
            list_timeout: config.list_timeout(),
            default_working_dir: config.default_working_dir.clone(),
        }
    }
}

enum RegistrarCommand {
    Start {
        name: Option<String>,
        working_dir: Option<PathBuf>,
        reply: oneshot::Sender<Result<String, ThreadError>>,
    },
    Lookup {
        name: String,
        reply: oneshot::Sender<Option<WorkerClient>>,
    },
    List {
        reply: oneshot::Sender<Vec<mpsc::Sender<WorkerCommand>>>,
    },
    Remove {
        name: String,
        reply: oneshot::Sender<Option<WorkerHandle>>,
    },
}

/// Cloneable client for the thread registry.
///
/// Dropping every clone stops the registrar; workers then finish their
/// current turn and exit.
#[derive(Clone)]
pub struct ThreadManager {
    tx: mpsc::Sender<RegistrarCommand>,
    bus: NotificationBus,
    list_timeout: Duration,
}

impl ThreadManager {
    /// Spawn the registrar. Must be called inside a tokio runtime.
    pub fn start(options: ThreadManagerOptions) -> Self {
        let bus = NotificationBus::new(options.bus_capacity);
        let delegator = Arc::new(
            Delegator::new(options.provider.clone(), options.profile.clone())
                .with_limits(options.delegation_limits),
        );
        let seed = options.profile.build(parent_tools(delegator));
        let settings = WorkerSettings {
            seed,
            runner: LoopRunner::new(options.provider).with_limits(options.limits),
            bus: bus.clone(),
            mailbox_capacity: options.mailbox_capacity,
        };

        let (tx, rx) = mpsc::channel(REGISTRAR_CAPACITY);
        let registrar = Registrar {
            threads: HashMap::new(),
            settings,
            default_working_dir: options.default_working_dir,
        };
        tokio::spawn(registrar.run(rx));

        Self {
            tx,
            bus,
            list_timeout: options.list_timeout,
        }
    }

    /// Shorthand for [`ThreadManagerOptions::from_config`] + [`ThreadManager::start`].
    pub fn from_config(provider: Arc<dyn ModelProvider>, config: &SkeinConfig) -> Self {
        Self::start(ThreadManagerOptions::from_config(provider, config))
    }

    /// Start a thread, or return the existing one with that name.
    ///
    /// Without a name, a fresh `adjective-noun-NNNN` name is generated.
    /// `working_dir` defaults to the configured directory, then the process
    /// working directory.
    pub async fn start_thread(
        &self,
        name: Option<String>,
        working_dir: Option<PathBuf>,
    ) -> Result<String, ThreadError> {
        let (reply, rx) = oneshot::channel();
        self.request(RegistrarCommand::Start {
            name,
            working_dir,
            reply,
        })
        .await?;
        rx.await.map_err(|_| ThreadError::ManagerStopped)?
    }

    /// Snapshot of the thread's agent as of its last completed turn.
    pub async fn get_agent(&self, name: &str) -> Result<Agent, ThreadError> {
        self.query(name, |reply| WorkerCommand::GetAgent { reply }).await
    }

    pub async fn get_working_dir(&self, name: &str) -> Result<PathBuf, ThreadError> {
        self.query(name, |reply| WorkerCommand::GetWorkingDir { reply }).await
    }

    /// Queue `text` for the thread and return. The outcome arrives on the
    /// bus under the thread's topic.
    ///
    /// Up to `mailbox_capacity` messages wait behind the running turn; once
    /// the mailbox is full this waits for room.
    pub async fn send_message(
        &self,
        name: &str,
        text: impl Into<String>,
    ) -> Result<(), ThreadError> {
        let worker = self.lookup(name).await?;
        worker
            .turns
            .send(text.into())
            .await
            .map_err(|_| ThreadError::NotFound(name.to_string()))
    }

    /// Every thread that answers within the list timeout, sorted by name.
    pub async fn list_threads(&self) -> Vec<ThreadEntry> {
        let (reply, rx) = oneshot::channel();
        if self.request(RegistrarCommand::List { reply }).await.is_err() {
            return Vec::new();
        }
        let Ok(workers) = rx.await else {
            return Vec::new();
        };

        let timeout = self.list_timeout;
        let queries = workers.into_iter().map(|worker| async move {
            let describe = async {
                let (reply, rx) = oneshot::channel();
                worker.send(WorkerCommand::Describe { reply }).await.ok()?;
                rx.await.ok()
            };
            tokio::time::timeout(timeout, describe).await.ok().flatten()
        });

        let mut entries: Vec<ThreadEntry> =
            future::join_all(queries).await.into_iter().flatten().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Stop a thread after its current turn and forget it.
    pub async fn stop_thread(&self, name: &str) -> Result<(), ThreadError> {
        let (reply, rx) = oneshot::channel();
        self.request(RegistrarCommand::Remove {
            name: name.to_string(),
            reply,
        })
        .await?;
        let handle = rx
            .await
            .map_err(|_| ThreadError::ManagerStopped)?
            .ok_or_else(|| ThreadError::NotFound(name.to_string()))?;

        let _ = handle.client.control.send(WorkerCommand::Stop).await;
        let _ = handle.join.await;
        info!(thread = %name, "thread removed");
        Ok(())
    }

    /// Subscribe to `thread:<name>` notifications.
    pub fn subscribe(&self, name: &str) -> Subscription {
        self.bus.subscribe(name)
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    async fn request(&self, command: RegistrarCommand) -> Result<(), ThreadError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| ThreadError::ManagerStopped)
    }

    async fn lookup(&self, name: &str) -> Result<WorkerClient, ThreadError> {
        let (reply, rx) = oneshot::channel();
        self.request(RegistrarCommand::Lookup {
            name: name.to_string(),
            reply,
        })
        .await?;
        rx.await
            .map_err(|_| ThreadError::ManagerStopped)?
            .ok_or_else(|| ThreadError::NotFound(name.to_string()))
    }

    async fn query<T, F>(&self, name: &str, command: F) -> Result<T, ThreadError>
    where
        F: FnOnce(oneshot::Sender<T>) -> WorkerCommand,
    {
        let worker = self.lookup(name).await?;
        let (reply, rx) = oneshot::channel();
        let not_found = || ThreadError::NotFound(name.to_string());
        worker
            .control
            .send(command(reply))
            .await
            .map_err(|_| not_found())?;
        rx.await.map_err(|_| not_found())
    }
}

impl std::fmt::Debug for ThreadManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadManager")
            .field("list_timeout", &self.list_timeout)
            .finish_non_exhaustive()
    }
}

struct Registrar {
    threads: HashMap<String, WorkerHandle>,
    settings: WorkerSettings,
    default_working_dir: Option<PathBuf>,
}

impl Registrar {
    async fn run(mut self, mut rx: mpsc::Receiver<RegistrarCommand>) {
        while let Some(command) = rx.recv().await {
            match command {
                RegistrarCommand::Start {
                    name,
                    working_dir,
                    reply,
                } => {
                    let result = self.start(name, working_dir).await;
                    let _ = reply.send(result);
                }
                RegistrarCommand::Lookup { name, reply } => {
                    let _ = reply.send(self.live(&name).map(|h| h.client.clone()));
                }
                RegistrarCommand::List { reply } => {
                    self.threads.retain(|_, h| h.is_alive());
                    let controls = self.threads.values().map(|h| h.client.control.clone());
                    let _ = reply.send(controls.collect());
                }
                RegistrarCommand::Remove { name, reply } => {
                    let _ = reply.send(self.threads.remove(&name));
                }
            }
        }
        debug!(threads = self.threads.len(), "registrar stopped");
    }

    /// The live worker for `name`. A dead worker is dropped from the map.
    fn live(&mut self, name: &str) -> Option<&WorkerHandle> {
        if self.threads.get(name).is_some_and(|h| !h.is_alive()) {
            info!(thread = %name, "dropping dead thread");
            self.threads.remove(name);
        }
        self.threads.get(name)
    }

    async fn start(
        &mut self,
        name: Option<String>,
        working_dir: Option<PathBuf>,
    ) -> Result<String, ThreadError> {
        let name = match name.filter(|n| !n.trim().is_empty()) {
            Some(name) => {
                if self.live(&name).is_some() {
                    debug!(thread = %name, "thread already running");
                    return Ok(name);
                }
                name
            }
            None => self.fresh_name(),
        };

        let working_dir = match working_dir.or_else(|| self.default_working_dir.clone()) {
            Some(dir) => dir,
            None => std::env::current_dir().map_err(|e| ThreadError::InvalidWorkingDir {
                path: ".".into(),
                reason: e.to_string(),
            })?,
        };

        let mut settings = self.settings.clone();
        settings.seed = settings.seed.with_identity(name.clone());
        let handle = spawn_worker(name.clone(), working_dir, &settings).await?;
        self.threads.insert(name.clone(), handle);
        Ok(name)
    }

    fn fresh_name(&mut self) -> String {
        loop {
            let name = generate_name();
            if self.live(&name).is_none() {
                return name;
            }
        }
    }
}
