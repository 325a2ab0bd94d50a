// Copyright (c) 2025. Licensed under Apache License, Version 2.0.

//! The topic-indexed subscriber registry (observer manager). See [`Registry`] and
//! [`SubscriptionGuard`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::debug;

use crate::message::{Message, MessageType};
use crate::util::{offer_or_drop, CloseOnce};

type SubscriptionId = u64;

struct Subscription {
    id: SubscriptionId,
    sender: mpsc::Sender<Message>,
    close_once: Arc<CloseOnce>,
}

/// RAII handle returned alongside a subscriber's receiver.
///
/// Dropping it removes the subscription from the registry and closes the sender side
/// exactly once, whether that happens because the subscriber dropped this guard or
/// because [`Registry::close`] ran first — both paths share the same [`CloseOnce`]
/// latch, so there's no double-close regardless of which wins the race.
#[must_use = "dropping this guard immediately unsubscribes"]
pub struct SubscriptionGuard {
    id: SubscriptionId,
    topic: MessageType,
    registry: Option<Arc<RegistryInner>>,
    close_once: Arc<CloseOnce>,
}

impl std::fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionGuard").field("id", &self.id).field("topic", &self.topic).finish()
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let id = self.id;
        let topic = self.topic;
        self.close_once.close_with(|| {
            if let Some(registry) = &self.registry {
                registry.remove(topic, id);
            }
        });
    }
}

struct RegistryInner {
    subscriptions: Mutex<HashMap<MessageType, Vec<Subscription>>>,
    next_id: AtomicU64,
    stopped: CloseOnce,
}

impl RegistryInner {
    fn remove(&self, topic: MessageType, id: SubscriptionId) {
        let mut map = self.lock();
        if let Some(subs) = map.get_mut(&topic) {
            subs.retain(|s| s.id != id);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<MessageType, Vec<Subscription>>> {
        self.subscriptions.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// The observer manager: a topic-indexed set of subscriptions, with best-effort
/// broadcast and a graceful, idempotent close.
pub struct Registry {
    inner: Arc<RegistryInner>,
    buffer: usize,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count: usize = self.inner.lock().values().map(Vec::len).sum();
        f.debug_struct("Registry").field("subscriber_count", &count).field("buffer", &self.buffer).finish()
    }
}

impl Registry {
    /// `buffer` is the capacity of each subscriber's receive channel (≥ 1).
    #[must_use]
    pub fn new(buffer: usize) -> Self {
        assert!(buffer >= 1, "subscriber buffer must be >= 1");
        Self {
            inner: Arc::new(RegistryInner {
                subscriptions: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
                stopped: CloseOnce::new(),
            }),
            buffer,
        }
    }

    /// Subscribes to `topic`. After [`Registry::close`] has run, returns a receiver
    /// whose sender has already been dropped (so `recv()` resolves to `None`
    /// immediately) and a no-op guard.
    pub fn subscribe(&self, topic: MessageType) -> (mpsc::Receiver<Message>, SubscriptionGuard) {
        let (tx, rx) = mpsc::channel(self.buffer);

        if self.inner.stopped.is_closed() {
            drop(tx);
            return (rx, SubscriptionGuard { id: 0, topic, registry: None, close_once: Arc::new(CloseOnce::new()) });
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let close_once = Arc::new(CloseOnce::new());
        let subscription = Subscription { id, sender: tx, close_once: Arc::clone(&close_once) };
        self.inner.lock().entry(topic).or_default().push(subscription);

        (rx, SubscriptionGuard { id, topic, registry: Some(Arc::clone(&self.inner)), close_once })
    }

    /// Snapshots the current subscribers for `msg.topic` and offers the message to each,
    /// non-blockingly. A slow subscriber only drops its own copy; it never delays or
    /// blocks delivery to any other subscriber.
    pub fn notify(&self, msg: &Message) {
        let snapshot: Vec<(SubscriptionId, mpsc::Sender<Message>)> = {
            let map = self.inner.lock();
            map.get(&msg.topic).map(|subs| subs.iter().map(|s| (s.id, s.sender.clone())).collect()).unwrap_or_default()
        };

        for (id, sender) in snapshot {
            if !offer_or_drop(&sender, msg.clone()) {
                debug!(subscriber = id, topic = ?msg.topic, "dropping message for slow subscriber");
            }
        }
    }

    /// Idempotent. Closes every subscriber's sender exactly once and marks the registry
    /// stopped so future `subscribe` calls fail fast.
    pub fn close(&self) {
        self.inner.stopped.close_with(|| {
            let mut map = self.inner.lock();
            for subs in map.values_mut() {
                for sub in subs.drain(..) {
                    sub.close_once.close_with(|| drop(sub.sender));
                }
            }
        });
    }
}
