// Copyright (c) 2025. Licensed under Apache License, Version 2.0.

//! Explicit, passed-by-value relayer configuration. See [`RelayerConfig`].

use std::time::Duration;

/// Ambient mutable state (a global priority-queue capacity) becomes explicit
/// configuration here, passed into [`Relayer::new`](crate::relayer::Relayer::new).
#[derive(Debug, Clone)]
pub struct RelayerConfig {
    /// Per-topic mailbox capacity. Must be `>= 1`.
    pub mailbox_capacity: usize,

    /// How often the reader stage ticks. Bounds the gap between a burst landing in the
    /// mailbox and the drain stage collapsing it.
    pub tick_period: Duration,

    /// Per-subscriber receive channel capacity. Must be `>= 1`.
    pub subscriber_buffer: usize,
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self { mailbox_capacity: 100, tick_period: Duration::from_millis(80), subscriber_buffer: 1 }
    }
}
