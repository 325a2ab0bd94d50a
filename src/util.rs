// Copyright (c) 2025. Licensed under Apache License, Version 2.0.

//! Small concurrency primitives shared across the pipeline: a close-once latch and
//! non-blocking send helpers. See [`CloseOnce`], [`offer_or_drop`], [`take_n`].

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Latches a boolean so an idempotent action (closing a channel, firing a shutdown hook)
/// runs at most once, even when invoked concurrently from a `Drop` impl and an explicit
/// call.
///
/// Mirrors the "waker cleared to `None` is the liveness signal" idiom the resilient
/// reactor thread pattern uses for its termination guard: here, the flip from `false` to
/// `true` IS the one-time signal, and `close` is what every caller actually wants to run
/// exactly once.
#[derive(Debug, Default)]
pub struct CloseOnce {
    closed: AtomicBool,
}

impl CloseOnce {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Runs `f` the first time this is called; every subsequent call (including
    /// concurrent ones — only one wins the compare-exchange) is a no-op.
    pub fn close_with(&self, f: impl FnOnce()) {
        if self.try_claim() {
            f();
        }
    }

    /// Claims the latch, returning `true` only for the caller that flips it from
    /// unclosed to closed. Useful when the caller needs to distinguish "I closed it"
    /// from "someone already did" rather than just running a side effect once.
    pub fn try_claim(&self) -> bool {
        self.closed.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool { self.closed.load(Ordering::SeqCst) }
}

/// Non-blocking send: delivers `v` if the receiver has buffer space, drops it otherwise.
/// Returns whether it was delivered.
///
/// This is the only way the relayer ever sends to a subscriber or onto the heartbeat/
/// error channels — no stage blocks waiting for a slow consumer.
pub fn offer_or_drop<T>(tx: &mpsc::Sender<T>, v: T) -> bool { tx.try_send(v).is_ok() }

/// Drains up to `n` values from `rx`, stopping early if `cancel` fires or the channel
/// closes.
pub async fn take_n<T>(cancel: &CancellationToken, rx: &mut mpsc::Receiver<T>, n: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(n);
    while out.len() < n {
        tokio::select! {
            () = cancel.cancelled() => break,
            maybe = rx.recv() => match maybe {
                Some(v) => out.push(v),
                None => break,
            }
        }
    }
    out
}
