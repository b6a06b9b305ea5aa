//! In-process event hub
//!
//! Fans connection-state changes and decoded messages out to subscribers.
//! Callbacks run synchronously on the publishing task, in registration
//! order, outside the registry lock. A panicking callback is logged and
//! skipped; the remaining subscribers still run.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::error;

use cefpipe_core::Message;

/// Handle returned by the subscribe calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Event delivered to channel subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubEvent {
    ConnectionStateChanged(bool),
    MessageReceived(Message),
}

type StateCallback = Arc<dyn Fn(bool) + Send + Sync>;
type MessageCallback = Arc<dyn Fn(&Message) + Send + Sync>;

/// Subscriber registry for both event kinds
#[derive(Default)]
pub struct EventHub {
    next_id: AtomicU64,
    state_subs: Mutex<Vec<(SubscriptionId, StateCallback)>>,
    message_subs: Mutex<Vec<(SubscriptionId, MessageCallback)>>,
    channels: Mutex<Vec<mpsc::UnboundedSender<HubEvent>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection-state callback
    pub fn subscribe_state<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = self.next_id();
        lock(&self.state_subs).push((id, Arc::new(callback)));
        id
    }

    /// Register a message-received callback
    pub fn subscribe_messages<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let id = self.next_id();
        lock(&self.message_subs).push((id, Arc::new(callback)));
        id
    }

    /// Receive both event kinds on an async channel
    ///
    /// The sender is dropped from the hub once the receiver goes away.
    pub fn subscribe_channel(&self) -> mpsc::UnboundedReceiver<HubEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.channels).push(tx);
        rx
    }

    /// Remove a callback. Returns false if the id was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut removed = false;
        lock(&self.state_subs).retain(|(sub, _)| {
            let keep = *sub != id;
            removed |= !keep;
            keep
        });
        lock(&self.message_subs).retain(|(sub, _)| {
            let keep = *sub != id;
            removed |= !keep;
            keep
        });
        removed
    }

    /// Number of registered callbacks and live channels
    pub fn subscriber_count(&self) -> usize {
        lock(&self.state_subs).len() + lock(&self.message_subs).len() + lock(&self.channels).len()
    }

    pub fn publish_state(&self, connected: bool) {
        let subs: Vec<StateCallback> = lock(&self.state_subs)
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();

        for cb in subs {
            if catch_unwind(AssertUnwindSafe(|| cb(connected))).is_err() {
                error!(connected, "Connection state subscriber panicked");
            }
        }

        self.publish_channels(HubEvent::ConnectionStateChanged(connected));
    }

    pub fn publish_message(&self, msg: &Message) {
        let subs: Vec<MessageCallback> = lock(&self.message_subs)
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();

        for cb in subs {
            if catch_unwind(AssertUnwindSafe(|| cb(msg))).is_err() {
                error!(opcode = msg.opcode(), "Message subscriber panicked");
            }
        }

        self.publish_channels(HubEvent::MessageReceived(*msg));
    }

    fn publish_channels(&self, event: HubEvent) {
        lock(&self.channels).retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

// Callbacks never run under these locks, so a poisoned registry is still consistent
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
