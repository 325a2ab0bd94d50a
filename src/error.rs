// Copyright (c) 2025. Licensed under Apache License, Version 2.0.

//! Typed errors for the relayer's public surface. See [`RelayerError`] and
//! [`ClassifiedError`].

use std::fmt;

/// Errors from [`Relayer::start`](crate::relayer::Relayer::start) and the lifecycle
/// controller.
///
/// Each variant is a distinct, non-recoverable failure mode of the relayer itself (not
/// of the source it wraps — see [`SourceAdapter::restart`](crate::source::SourceAdapter)
/// for that).
#[derive(Debug, thiserror::Error)]
pub enum RelayerError {
    /// `start()` was called on a relayer that is already `Running` or `Draining`.
    #[error("relayer already started")]
    StartTwice,

    /// The source's fatal-error restart attempt itself failed; the relayer fail-stops
    /// rather than looping on a source that cannot recover. Delivered as the `Err` side
    /// of the value sent on [`RelayerHandle::terminated`](crate::relayer::RelayerHandle).
    #[error("source restart exhausted after a fatal error: {reason}")]
    RestartExhausted { reason: String },
}

/// Convenience wrapper pairing a source-supplied error with its fatal/transient
/// classification, for adapters whose native error type doesn't already carry one.
///
/// Most [`SourceAdapter`](crate::source::SourceAdapter) implementations return their own
/// error type directly; this wrapper exists for adapters built over an error type the
/// caller doesn't own (e.g. an I/O error) and needs to classify externally.
#[derive(Debug)]
pub struct ClassifiedError<E> {
    pub source: E,
    pub fatal: bool,
}

impl<E> ClassifiedError<E> {
    #[must_use]
    pub fn transient(source: E) -> Self { Self { source, fatal: false } }

    #[must_use]
    pub fn fatal(source: E) -> Self { Self { source, fatal: true } }

    #[must_use]
    pub fn is_fatal(&self) -> bool { self.fatal }
}

impl<E: fmt::Display> fmt::Display for ClassifiedError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.source, if self.fatal { "fatal" } else { "transient" })
    }
}

impl<E: std::error::Error + 'static> std::error::Error for ClassifiedError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> { Some(&self.source) }
}
