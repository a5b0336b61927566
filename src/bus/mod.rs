//! In-process publish/subscribe for thread state changes.
//!
//! Delivery is best effort: publishing never blocks, a subscriber whose
//! buffer is full misses that notification, and closed subscribers are
//! pruned on the next publish. Order is preserved per topic. There is no
//! replay for late subscribers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::trace;

use crate::agent::Agent;

pub const DEFAULT_BUS_CAPACITY: usize = 64;

/// Topic for a thread's notifications.
pub fn topic(thread: &str) -> String {
    format!("thread:{thread}")
}

/// A change observed on a thread.
#[derive(Debug, Clone)]
pub enum Notification {
    /// A turn finished; `agent` is the new snapshot.
    Updated { thread: String, agent: Agent },
    /// A turn failed. `agent` is the history as far as the turn got,
    /// including tool rounds that already ran; the thread itself keeps its
    /// last good agent.
    Failed {
        thread: String,
        reason: String,
        agent: Agent,
    },
}

impl Notification {
    pub fn thread(&self) -> &str {
        match self {
            Self::Updated { thread, .. } | Self::Failed { thread, .. } => thread,
        }
    }
}

/// Receiving end of a topic subscription.
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    rx: mpsc::Receiver<Notification>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the next notification. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Notification> {
        self.rx.try_recv().ok()
    }
}

/// Cloneable handle to a shared bus.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    subscribers: Arc<Mutex<HashMap<String, Vec<mpsc::Sender<Notification>>>>>,
    capacity: usize,
}

impl NotificationBus {
    /// `capacity` is the per-subscriber buffer size.
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Arc::default(),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self, thread: &str) -> Subscription {
        let topic = topic(thread);
        let (tx, rx) = mpsc::channel(self.capacity);
        self.lock().entry(topic.clone()).or_default().push(tx);
        Subscription { topic, rx }
    }

    /// Publish to every live subscriber of `thread`. Returns how many
    /// subscribers accepted the notification.
    pub fn publish(&self, thread: &str, notification: Notification) -> usize {
        let topic = topic(thread);
        let mut subscribers = self.lock();
        let Some(senders) = subscribers.get_mut(&topic) else {
            return 0;
        };

        let mut delivered = 0;
        senders.retain(|tx| match tx.try_send(notification.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                trace!(%topic, "subscriber lagging; notification dropped");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
        if senders.is_empty() {
            subscribers.remove(&topic);
        }
        delivered
    }

    /// Live subscribers of `thread` (closed ones may linger until the next
    /// publish).
    pub fn subscriber_count(&self, thread: &str) -> usize {
        self.lock().get(&topic(thread)).map_or(0, Vec::len)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<mpsc::Sender<Notification>>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}
