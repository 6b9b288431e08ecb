//! Scope-keyed subscription table for live broadcasts.
//!
//! # Invariants
//! - Subscriptions are tracked in an explicit table owned by the bus; no
//!   ambient room registry.
//! - Publishing never blocks: events to scopes without subscribers are
//!   dropped, and a receiver that lags past the channel capacity loses the
//!   oldest events rather than stalling the sender.

use crate::fanout::{ChangeEvent, Scope};
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::broadcast;

/// Buffered events per topic before the oldest are overwritten for lagging
/// receivers.
const TOPIC_CAPACITY: usize = 64;

/// Subscription table keyed by scope, one broadcast channel per topic.
pub struct ScopeBus {
    topics: Mutex<HashMap<Scope, broadcast::Sender<ChangeEvent>>>,
    capacity: usize,
}

impl Default for ScopeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeBus {
    pub fn new() -> Self {
        Self::with_capacity(TOPIC_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// Registers interest in one scope and returns its event stream.
    ///
    /// Dropping the receiver ends delivery to that subscriber.
    pub fn subscribe(&self, scope: Scope) -> broadcast::Receiver<ChangeEvent> {
        let mut topics = self.topics.lock();
        topics
            .entry(scope)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Prunes the topic entry for a scope once it has no live receivers.
    ///
    /// Delivery itself ends when a subscriber drops its receiver; this only
    /// keeps the table from accumulating dead topics.
    pub fn unsubscribe(&self, scope: Scope) {
        let mut topics = self.topics.lock();
        if let Some(sender) = topics.get(&scope) {
            if sender.receiver_count() == 0 {
                topics.remove(&scope);
            }
        }
    }

    /// Delivers one event to every current subscriber of its scope.
    ///
    /// Returns the number of receivers reached; zero when the scope has no
    /// subscribers.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        let topics = self.topics.lock();
        match topics.get(&event.scope) {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        }
    }

    /// Current number of live receivers for one scope.
    pub fn subscriber_count(&self, scope: Scope) -> usize {
        self.topics
            .lock()
            .get(&scope)
            .map_or(0, broadcast::Sender::receiver_count)
    }
}
