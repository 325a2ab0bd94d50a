// Copyright (c) 2025. Licensed under Apache License, Version 2.0.

//! The source adapter contract the relayer reads from. See [`SourceAdapter`].

use crate::message::Message;

/// The unreliable "network reader" the relayer polls.
///
/// The relayer only ever calls [`read`](Self::read) and, on a fatal error,
/// [`restart`](Self::restart). Everything else about the concrete source (a real socket
/// in production, a canned sequence in tests) is opaque to the core.
#[async_trait::async_trait]
pub trait SourceAdapter: Send {
    type Error: SourceError;

    /// Reads the next message. Blocks (suspends) until one is available or an error
    /// occurs; the caller races this against the relayer's cancellation token.
    async fn read(&mut self) -> Result<Message, Self::Error>;

    /// Re-establishes the source after a fatal error. Failure here is terminal — the
    /// relayer fail-stops rather than retrying indefinitely.
    async fn restart(&mut self) -> Result<(), Self::Error>;
}

/// Classifies a source error as fatal (requires [`SourceAdapter::restart`]) or
/// transient (reported, loop continues).
pub trait SourceError: std::error::Error + Send + 'static {
    fn is_fatal(&self) -> bool;
}
