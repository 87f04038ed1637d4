// In-process subscriber registry and broadcast fan-out
//
// Holds no event history: a subscriber only receives events broadcast while
// its channel is registered. The durable log plus the replay endpoint cover
// everything else.

use academy_contracts::{Event, LifecycleFrame, StreamFrame};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

/// Unique identifier for one open subscriber channel (server-generated)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Registry of open subscriber channels.
///
/// Registration, removal, and broadcast may run concurrently from request
/// handlers, teardown paths, and producers; DashMap serializes the shard-level
/// mutation so no caller needs an outer lock.
pub struct Hub {
    subscribers: DashMap<SubscriberId, UnboundedSender<StreamFrame>>,
    next_id: AtomicU64,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new subscriber and return its id plus the frame channel.
    ///
    /// The first frame on the channel is always the synthetic `connected`
    /// lifecycle frame, so a client can distinguish an open-but-idle stream
    /// from one that never opened.
    pub fn subscribe(&self) -> (SubscriberId, UnboundedReceiver<StreamFrame>) {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();

        let connected = StreamFrame::Lifecycle(LifecycleFrame::Connected {
            timestamp: Utc::now().timestamp_millis(),
        });
        // The receiver cannot be gone yet; ignore the impossible failure.
        let _ = tx.send(connected);

        self.subscribers.insert(id, tx);
        debug!(subscriber_id = id.0, "registered realtime subscriber");

        (id, rx)
    }

    /// Remove a subscriber. Safe to call for ids already removed.
    pub fn unsubscribe(&self, id: &SubscriberId) {
        if self.subscribers.remove(id).is_some() {
            debug!(subscriber_id = id.0, "unregistered realtime subscriber");
        }
    }

    /// Push one event to every open subscriber channel.
    ///
    /// A send failure means the receiver side is gone; the subscriber is
    /// dropped from the registry and delivery to the rest continues.
    pub fn broadcast(&self, event: &Event) {
        let frame = StreamFrame::Event(event.clone());

        let mut dead: Vec<SubscriberId> = Vec::new();
        for entry in self.subscribers.iter() {
            if entry.value().send(frame.clone()).is_err() {
                dead.push(*entry.key());
            }
        }

        // Removal happens outside the iteration so a dead channel never
        // blocks the shard lock mid-broadcast.
        for id in dead {
            self.subscribers.remove(&id);
            warn!(subscriber_id = id.0, "dropped dead realtime subscriber");
        }
    }

    /// Number of currently attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}
