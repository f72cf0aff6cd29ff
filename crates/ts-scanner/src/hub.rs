//! Live subscriber registry and event fan-out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use ts_types::alerts::NotificationEvent;
use ts_types::errors::DeliveryError;

pub type SubscriberId = u64;

/// Delivery handle for one connected subscriber.
///
/// `try_deliver` must not wait on the subscriber: a slow consumer gets
/// `Backpressure`, not a stalled broadcast.
pub trait SubscriberSink: Send + Sync {
    fn try_deliver(
        &self,
        subscriber_id: SubscriberId,
        event: &NotificationEvent,
    ) -> Result<(), DeliveryError>;

    fn is_open(&self) -> bool;
}

impl SubscriberSink for mpsc::Sender<NotificationEvent> {
    fn try_deliver(
        &self,
        subscriber_id: SubscriberId,
        event: &NotificationEvent,
    ) -> Result<(), DeliveryError> {
        self.try_send(event.clone()).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Backpressure { subscriber_id },
            TrySendError::Closed(_) => DeliveryError::Closed { subscriber_id },
        })
    }

    fn is_open(&self) -> bool {
        !self.is_closed()
    }
}

/// Receiving side handed to a subscriber on connect.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub receiver: mpsc::Receiver<NotificationEvent>,
}

/// Per-broadcast delivery tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Open subscribers that could not take the event this time.
    pub skipped: usize,
    /// Closed subscribers dropped from the registry.
    pub pruned: usize,
}

/// Registry of live subscribers. Holds delivery handles only; closing a
/// subscriber's channel is up to the subscriber.
#[derive(Default)]
pub struct NotificationHub {
    subscribers: DashMap<SubscriberId, Arc<dyn SubscriberSink>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for NotificationHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationHub")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an arbitrary sink.
    pub fn register(&self, sink: Arc<dyn SubscriberSink>) -> SubscriberId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.subscribers.insert(id, sink);
        debug!(subscriber_id = id, total = self.subscribers.len(), "subscriber connected");
        id
    }

    /// Register a bounded channel of `buffer` events and return its receiver.
    pub fn subscribe(&self, buffer: usize) -> Subscription {
        let (tx, receiver) = mpsc::channel(buffer.max(1));
        let id = self.register(Arc::new(tx));
        Subscription { id, receiver }
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.remove(&id).is_some();
        if removed {
            debug!(subscriber_id = id, total = self.subscribers.len(), "subscriber disconnected");
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver `event` to every open subscriber. Never fails; problems with
    /// individual subscribers are logged and counted.
    pub fn broadcast(&self, event: &NotificationEvent) -> BroadcastReport {
        // Snapshot first so no shard lock is held while delivering.
        let targets: Vec<(SubscriberId, Arc<dyn SubscriberSink>)> = self
            .subscribers
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();

        let mut report = BroadcastReport::default();
        let mut closed = Vec::new();

        for (id, sink) in targets {
            if !sink.is_open() {
                closed.push(id);
                continue;
            }
            match sink.try_deliver(id, event) {
                Ok(()) => report.delivered += 1,
                Err(DeliveryError::Closed { .. }) => closed.push(id),
                Err(e) => {
                    warn!(subscriber_id = id, error = %e, "notification not delivered");
                    report.skipped += 1;
                }
            }
        }

        for id in closed {
            if self.subscribers.remove(&id).is_some() {
                report.pruned += 1;
            }
        }

        report
    }
}
