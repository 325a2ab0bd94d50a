// Copyright (c) 2025. Licensed under Apache License, Version 2.0.

//! The typed, per-topic mailbox: bounded LIFO buffering with staleness filtering and
//! drop-oldest overflow. See [`Mailbox`].

use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::message::{Message, UNSTAMPED};
use crate::oracle::TimestampOracle;

/// Internal state protected by a single lock, so `add` and `drain` can never interleave
/// the stack mutation with the watermark update.
struct MailboxState {
    stack: Vec<Message>,
    last_drained_at: i64,
}

/// A bounded, priority-aware mailbox for a single message type.
///
/// - Overflow drops the oldest message, unless the incoming message is itself older than
///   the oldest stored one (the "newer of two" rule — see [`Mailbox::add`]).
/// - `drain` atomically captures a watermark and returns every buffered message
///   newest-first; any later `add` with a token below that watermark is discarded as
///   stale.
pub struct Mailbox {
    capacity: usize,
    oracle: Arc<dyn TimestampOracle>,
    state: Mutex<MailboxState>,
}

impl std::fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Mailbox")
            .field("capacity", &self.capacity)
            .field("len", &state.stack.len())
            .field("last_drained_at", &state.last_drained_at)
            .finish()
    }
}

impl Mailbox {
    #[must_use]
    pub fn new(capacity: usize, oracle: Arc<dyn TimestampOracle>) -> Self {
        assert!(capacity >= 1, "Mailbox capacity must be >= 1");
        Self {
            capacity,
            oracle,
            state: Mutex::new(MailboxState { stack: Vec::with_capacity(capacity), last_drained_at: UNSTAMPED }),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize { self.capacity }

    #[must_use]
    pub fn len(&self) -> usize { self.lock().stack.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    #[must_use]
    pub fn last_drained_at(&self) -> i64 { self.lock().last_drained_at }

    /// Stamps `msg` (if unstamped), applies the staleness rule, then the capacity rule.
    ///
    /// Stamping happens under the lock so a concurrent `drain` can never observe a
    /// watermark that's newer than a token this call is about to compare against.
    pub fn add(&self, mut msg: Message) {
        let mut state = self.lock();

        if !msg.is_stamped() {
            msg.ordering_token = self.oracle.next();
        }

        if msg.ordering_token < state.last_drained_at {
            trace!(topic = ?msg.topic, token = msg.ordering_token, watermark = state.last_drained_at, "dropping stale message");
            return;
        }

        if state.stack.len() < self.capacity {
            state.stack.push(msg);
            return;
        }

        // Full: compare the oldest stored message against the incoming one, keep the
        // newer of the two at the bottom of the stack.
        let oldest = state.stack.remove(0);
        if oldest.ordering_token >= msg.ordering_token {
            // The oldest-seen message is still newer (or equal) — the incoming arrival
            // is out of order and loses.
            state.stack.insert(0, oldest);
            trace!(topic = ?msg.topic, token = msg.ordering_token, "dropping out-of-order overflow arrival");
        } else {
            state.stack.push(msg);
        }
    }

    /// Atomically captures a fresh watermark and returns every buffered message
    /// newest-first. The mailbox is empty after this returns.
    pub fn drain(&self) -> Vec<Message> {
        let mut state = self.lock();
        state.last_drained_at = self.oracle.next();
        let mut out = std::mem::take(&mut state.stack);
        out.reverse();
        out
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MailboxState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
