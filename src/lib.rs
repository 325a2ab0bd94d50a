// Copyright (c) 2025. Licensed under Apache License, Version 2.0.

//! An in-process message relayer: reads from an unreliable [`source::SourceAdapter`],
//! buffers in a priority-aware, bounded [`mailbox::Mailbox`] per [`message::MessageType`],
//! and fans out to topic subscribers through a [`registry::Registry`] without
//! head-of-line blocking.
//!
//! The entry point is [`relayer::Relayer`]: construct one with a [`config::RelayerConfig`],
//! call [`relayer::Relayer::subscribe`] for every topic of interest, then
//! [`relayer::Relayer::start`] with a concrete [`source::SourceAdapter`] and a root
//! [`tokio_util::sync::CancellationToken`]. Shutdown is cooperative: cancel the token,
//! await the returned `terminated` receiver.
//!
//! ```no_run
//! # use relay_core::{config::RelayerConfig, message::MessageType, relayer::Relayer};
//! # use std::sync::Arc;
//! # use tokio_util::sync::CancellationToken;
//! # async fn run<S: relay_core::source::SourceAdapter + 'static>(source: S) {
//! let relayer = Arc::new(Relayer::new(RelayerConfig::default()));
//! let (mut messages, _guard) = relayer.subscribe(MessageType::StartNewRound);
//! let cancel = CancellationToken::new();
//! let (handle, _errors) = Arc::clone(&relayer).start(source, cancel.clone()).unwrap();
//!
//! while let Some(msg) = messages.recv().await {
//!     println!("{msg:?}");
//! }
//!
//! cancel.cancel();
//! let _ = handle.terminated.await.unwrap();
//! # }
//! ```

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod mailbox;
pub mod message;
pub mod oracle;
pub mod registry;
pub mod relayer;
pub mod source;
pub mod stack;
pub mod util;

pub use config::RelayerConfig;
pub use error::RelayerError;
pub use message::{Message, MessageType};
pub use relayer::{Relayer, RelayerHandle, RelayerPhase, ReportedError};
pub use source::{SourceAdapter, SourceError};
