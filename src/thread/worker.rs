//! The task that owns one thread's agent.

use std::path::{Path, PathBuf};

use serde::Serialize;
use strum::Display;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::agent::Agent;
use crate::agent_loop::{LoopRunner, TurnError, TurnMode, TurnOutcome};
use crate::bus::{Notification, NotificationBus};
use crate::error::ThreadError;
use crate::tools::ToolExecutionContext;

/// Where a thread's worker is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ThreadState {
    Starting,
    Ready,
    Processing,
    Failed,
}

/// A row of [`ThreadManager::list_threads`](super::ThreadManager::list_threads).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadEntry {
    pub name: String,
    pub working_dir: PathBuf,
    pub state: ThreadState,
}

/// Queries and control for a worker. Turns travel on their own channel.
pub(crate) enum WorkerCommand {
    GetAgent { reply: oneshot::Sender<Agent> },
    GetWorkingDir { reply: oneshot::Sender<PathBuf> },
    Describe { reply: oneshot::Sender<ThreadEntry> },
    Stop,
}

const CONTROL_CAPACITY: usize = 16;

/// Everything a worker needs besides its name and directory.
#[derive(Clone)]
pub(crate) struct WorkerSettings {
    pub(crate) seed: Agent,
    pub(crate) runner: LoopRunner,
    pub(crate) bus: NotificationBus,
    pub(crate) mailbox_capacity: usize,
}

/// Cloneable senders for a running worker.
///
/// `turns` is the thread's mailbox: at most `mailbox_capacity` messages wait
/// behind the current turn, and senders wait for room beyond that.
#[derive(Clone)]
pub(crate) struct WorkerClient {
    pub(crate) control: mpsc::Sender<WorkerCommand>,
    pub(crate) turns: mpsc::Sender<String>,
}

/// The registrar's handle on a running worker.
pub(crate) struct WorkerHandle {
    pub(crate) client: WorkerClient,
    pub(crate) join: JoinHandle<()>,
}

impl WorkerHandle {
    pub(crate) fn is_alive(&self) -> bool {
        !self.join.is_finished() && !self.client.control.is_closed()
    }
}

type TurnResult = Result<TurnOutcome, TurnError>;

enum Event {
    Command(Option<WorkerCommand>),
    Message(Option<String>),
    TurnDone(Result<TurnResult, JoinError>),
}

/// Spawn a worker and wait until it has validated `working_dir`.
///
/// On failure the task has already exited.
pub(crate) async fn spawn_worker(
    name: String,
    working_dir: PathBuf,
    settings: &WorkerSettings,
) -> Result<WorkerHandle, ThreadError> {
    let (control, control_rx) = mpsc::channel(CONTROL_CAPACITY);
    let (turns, turns_rx) = mpsc::channel(settings.mailbox_capacity.max(1));
    let (ready_tx, ready_rx) = oneshot::channel();
    let requested = working_dir.display().to_string();
    let join = tokio::spawn(run_worker(
        name,
        working_dir,
        settings.clone(),
        Mailboxes {
            control: control_rx,
            turns: turns_rx,
        },
        ready_tx,
    ));

    match ready_rx.await {
        Ok(Ok(())) => Ok(WorkerHandle {
            client: WorkerClient { control, turns },
            join,
        }),
        Ok(Err(err)) => Err(err),
        Err(_) => Err(ThreadError::InvalidWorkingDir {
            path: requested,
            reason: "worker exited during startup".into(),
        }),
    }
}

/// Check that `dir` is an existing directory and make it absolute.
///
/// Relative paths are joined onto the process working directory. Symlinks
/// are kept as given.
async fn validate_working_dir(dir: &Path) -> Result<PathBuf, ThreadError> {
    let invalid = |reason: String| ThreadError::InvalidWorkingDir {
        path: dir.display().to_string(),
        reason,
    };
    let absolute = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| invalid(e.to_string()))?
            .join(dir)
    };
    let metadata = tokio::fs::metadata(&absolute)
        .await
        .map_err(|e| invalid(e.to_string()))?;
    if !metadata.is_dir() {
        return Err(invalid("not a directory".into()));
    }
    Ok(absolute)
}

struct Mailboxes {
    control: mpsc::Receiver<WorkerCommand>,
    turns: mpsc::Receiver<String>,
}

async fn run_worker(
    name: String,
    working_dir: PathBuf,
    settings: WorkerSettings,
    mailboxes: Mailboxes,
    ready: oneshot::Sender<Result<(), ThreadError>>,
) {
    let working_dir = match validate_working_dir(&working_dir).await {
        Ok(dir) => dir,
        Err(err) => {
            warn!(thread = %name, state = %ThreadState::Failed, error = %err, "thread failed to start");
            let _ = ready.send(Err(err));
            return;
        }
    };

    let mut worker = ThreadWorker {
        agent: settings.seed.clone(),
        ctx: ToolExecutionContext::new(working_dir.clone()),
        name,
        working_dir,
        runner: settings.runner,
        bus: settings.bus,
        in_flight: None,
        state: ThreadState::Starting,
    };

    if ready.send(Ok(())).is_err() {
        return;
    }
    worker.state = ThreadState::Ready;
    info!(thread = %worker.name, working_dir = %worker.working_dir.display(), "thread started");
    worker.run(mailboxes).await;
    info!(thread = %worker.name, "thread stopped");
}

struct ThreadWorker {
    name: String,
    working_dir: PathBuf,
    ctx: ToolExecutionContext,
    agent: Agent,
    runner: LoopRunner,
    bus: NotificationBus,
    in_flight: Option<InFlight>,
    state: ThreadState,
}

/// A running turn and the agent it started from.
struct InFlight {
    handle: JoinHandle<TurnResult>,
    started_from: Agent,
}

impl ThreadWorker {
    async fn run(&mut self, mut mailboxes: Mailboxes) {
        let mut accepting_turns = true;
        loop {
            let idle = self.in_flight.is_none();
            let event = tokio::select! {
                command = mailboxes.control.recv() => Event::Command(command),
                // Messages stay in the bounded mailbox until the worker is idle.
                text = mailboxes.turns.recv(), if idle && accepting_turns => Event::Message(text),
                joined = join_in_flight(&mut self.in_flight), if !idle => Event::TurnDone(joined),
            };

            match event {
                Event::Message(Some(text)) => self.start_turn(text),
                Event::Message(None) => accepting_turns = false,
                Event::Command(Some(WorkerCommand::GetAgent { reply })) => {
                    let _ = reply.send(self.agent.clone());
                }
                Event::Command(Some(WorkerCommand::GetWorkingDir { reply })) => {
                    let _ = reply.send(self.working_dir.clone());
                }
                Event::Command(Some(WorkerCommand::Describe { reply })) => {
                    let _ = reply.send(ThreadEntry {
                        name: self.name.clone(),
                        working_dir: self.working_dir.clone(),
                        state: self.state,
                    });
                }
                Event::Command(Some(WorkerCommand::Stop)) | Event::Command(None) => {
                    // The current turn finishes; queued messages are dropped.
                    if let Some(in_flight) = self.in_flight.take() {
                        let joined = in_flight.handle.await;
                        self.finish_turn(joined, in_flight.started_from);
                    }
                    mailboxes.turns.close();
                    let mut dropped = 0usize;
                    while mailboxes.turns.try_recv().is_ok() {
                        dropped += 1;
                    }
                    if dropped > 0 {
                        debug!(thread = %self.name, dropped, "discarding queued messages");
                    }
                    return;
                }
                Event::TurnDone(joined) => {
                    if let Some(in_flight) = self.in_flight.take() {
                        self.finish_turn(joined, in_flight.started_from);
                    }
                }
            }
        }
    }

    fn start_turn(&mut self, text: String) {
        let agent = self.agent.clone().append(text);
        let started_from = agent.clone();
        let runner = self.runner.clone();
        let ctx = self.ctx.clone();
        debug!(thread = %self.name, "starting turn");

        self.state = ThreadState::Processing;
        let handle = tokio::spawn(async move {
            runner
                .run_turn(agent, &TurnMode::WhileNeedsResponse, &ctx)
                .await
        });
        self.in_flight = Some(InFlight {
            handle,
            started_from,
        });
    }

    fn finish_turn(&mut self, joined: Result<TurnResult, JoinError>, started_from: Agent) {
        self.state = ThreadState::Ready;
        let notification = match joined {
            Ok(Ok(outcome)) => {
                self.agent = outcome.agent;
                Notification::Updated {
                    thread: self.name.clone(),
                    agent: self.agent.clone(),
                }
            }
            Ok(Err(err)) => Notification::Failed {
                thread: self.name.clone(),
                reason: err.reason,
                agent: err.agent,
            },
            Err(join_err) => {
                error!(thread = %self.name, error = %join_err, "turn task crashed");
                Notification::Failed {
                    thread: self.name.clone(),
                    reason: format!("turn crashed: {join_err}"),
                    agent: started_from,
                }
            }
        };
        let delivered = self.bus.publish(&self.name, notification);
        debug!(thread = %self.name, delivered, "turn finished");
    }
}

async fn join_in_flight(in_flight: &mut Option<InFlight>) -> Result<TurnResult, JoinError> {
    match in_flight {
        Some(in_flight) => (&mut in_flight.handle).await,
        None => std::future::pending().await,
    }
}
