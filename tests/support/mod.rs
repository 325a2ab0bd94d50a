// Copyright (c) 2025. Licensed under Apache License, Version 2.0.

//! Shared scenario test support: an in-memory scripted [`SourceAdapter`] and a test-local
//! tracing subscriber.

use relay_core::source::{SourceAdapter, SourceError};
use relay_core::Message;

/// Installs a fmt subscriber for the current test binary, once. Safe to call from every
/// test — only the first call wins, and later calls are no-ops rather than panics.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[derive(Debug, thiserror::Error)]
#[error("scripted source error (fatal={fatal})")]
pub struct ScriptedError {
    pub fatal: bool,
}

impl SourceError for ScriptedError {
    fn is_fatal(&self) -> bool { self.fatal }
}

/// A source whose `read` replays a canned script, then blocks forever (so the reader
/// stage idles rather than busy-looping once the script is exhausted).
pub struct ScriptedSource {
    script: std::vec::IntoIter<Result<Message, ScriptedError>>,
    restart_behavior: RestartBehavior,
}

enum RestartBehavior {
    AlwaysSucceeds,
    AlwaysFails,
}

impl ScriptedSource {
    #[must_use]
    pub fn new(script: Vec<Result<Message, ScriptedError>>) -> Self {
        Self { script: script.into_iter(), restart_behavior: RestartBehavior::AlwaysSucceeds }
    }

    #[must_use]
    pub fn with_unrecoverable_restart(script: Vec<Result<Message, ScriptedError>>) -> Self {
        Self { script: script.into_iter(), restart_behavior: RestartBehavior::AlwaysFails }
    }
}

#[async_trait::async_trait]
impl SourceAdapter for ScriptedSource {
    type Error = ScriptedError;

    async fn read(&mut self) -> Result<Message, Self::Error> {
        match self.script.next() {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }

    async fn restart(&mut self) -> Result<(), Self::Error> {
        match self.restart_behavior {
            RestartBehavior::AlwaysSucceeds => Ok(()),
            RestartBehavior::AlwaysFails => Err(ScriptedError { fatal: true }),
        }
    }
}
