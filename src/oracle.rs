// Copyright (c) 2025. Licensed under Apache License, Version 2.0.

//! A monotonic source of ordering tokens. See [`TimestampOracle`].

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

/// A strictly monotonically non-decreasing source of `i64` ordering tokens.
///
/// Tokens need only be comparable to each other; they need not be wall-clock accurate.
/// [`SystemOracle`] backs this with the monotonic system clock in production;
/// [`CountingOracle`] backs it with a plain counter for deterministic tests.
pub trait TimestampOracle: Send + Sync {
    /// Returns the next token. Must never return a value smaller than any value it has
    /// already returned.
    fn next(&self) -> i64;
}

/// Backed by [`Instant`], the monotonic system clock. The epoch is the instant this
/// oracle was constructed, so tokens are nanoseconds-since-construction rather than
/// wall-clock time — fine, since tokens only need to be comparable.
#[derive(Debug)]
pub struct SystemOracle {
    epoch: Instant,
}

impl SystemOracle {
    #[must_use]
    pub fn new() -> Self { Self { epoch: Instant::now() } }
}

impl Default for SystemOracle {
    fn default() -> Self { Self::new() }
}

impl TimestampOracle for SystemOracle {
    fn next(&self) -> i64 {
        // i64::MAX nanoseconds is ~292 years; truncation here would require the
        // relayer to run continuously for that long.
        self.epoch.elapsed().as_nanos() as i64
    }
}

/// Backed by an [`AtomicI64`] counter that increments on every read. Deterministic and
/// cheap, for tests that assert on exact ordering-token values.
#[derive(Debug, Default)]
pub struct CountingOracle {
    next: AtomicI64,
}

impl CountingOracle {
    #[must_use]
    pub fn new() -> Self { Self { next: AtomicI64::new(0) } }

    /// Starts the counter at `start` instead of `0`.
    #[must_use]
    pub fn starting_at(start: i64) -> Self { Self { next: AtomicI64::new(start) } }
}

impl TimestampOracle for CountingOracle {
    fn next(&self) -> i64 { self.next.fetch_add(1, Ordering::SeqCst) }
}
