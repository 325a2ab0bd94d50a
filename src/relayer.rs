// Copyright (c) 2025. Licensed under Apache License, Version 2.0.

//! The relayer core: the heartbeat-driven reader/drain pipeline that ties the mailbox,
//! the registry and a [`SourceAdapter`] together. See [`Relayer`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::RelayerConfig;
use crate::error::RelayerError;
use crate::lifecycle::LifecycleController;
use crate::mailbox::Mailbox;
use crate::message::{Message, MessageType};
use crate::oracle::{SystemOracle, TimestampOracle};
use crate::registry::{Registry, SubscriptionGuard};
use crate::source::SourceAdapter;
use crate::util::{offer_or_drop, take_n, CloseOnce};

/// Where the relayer is in its one-shot lifecycle. Never moves backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayerPhase {
    Idle,
    Running,
    Draining,
    Terminated,
}

/// A source error, tagged with the fatal/transient classification the adapter assigned
/// it, as delivered on [`Relayer::errors`].
#[derive(Debug)]
pub struct ReportedError<E> {
    pub error: E,
    pub fatal: bool,
}

/// Returned by [`Relayer::start`]: the "terminated" signal plus a handle to the spawned
/// stages, so the caller can await clean shutdown without polling.
///
/// `terminated` resolves to `Ok(())` on a clean, cancel-driven shutdown, or
/// `Err(RelayerError::RestartExhausted)` when the relayer fail-stopped because a fatal
/// source error's restart attempt itself failed.
#[derive(Debug)]
pub struct RelayerHandle {
    pub terminated: oneshot::Receiver<Result<(), RelayerError>>,
}

/// The relayer core (component F): one mailbox per [`MessageType`], a shared
/// [`Registry`], and the reader/monitor task pair spawned by [`Relayer::start`].
pub struct Relayer<E> {
    config: RelayerConfig,
    mailboxes: HashMap<MessageType, Mailbox>,
    registry: Registry,
    phase: Mutex<RelayerPhase>,
    started: CloseOnce,
    terminal_error: Mutex<Option<RelayerError>>,
    _error_marker: std::marker::PhantomData<E>,
}

impl<E: std::fmt::Debug> std::fmt::Debug for Relayer<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relayer")
            .field("config", &self.config)
            .field("phase", &*self.phase.lock().unwrap_or_else(std::sync::PoisonError::into_inner))
            .finish()
    }
}

impl<E> Relayer<E>
where
    E: crate::source::SourceError,
{
    /// Builds a relayer with one mailbox per [`MessageType::ALL`] entry, all sharing a
    /// single [`SystemOracle`] so ordering tokens are comparable across topics.
    #[must_use]
    pub fn new(config: RelayerConfig) -> Self {
        let oracle: Arc<dyn TimestampOracle> = Arc::new(SystemOracle::new());
        let mailboxes = MessageType::ALL
            .into_iter()
            .map(|topic| (topic, Mailbox::new(config.mailbox_capacity, Arc::clone(&oracle))))
            .collect();
        let registry = Registry::new(config.subscriber_buffer);
        Self {
            config,
            mailboxes,
            registry,
            phase: Mutex::new(RelayerPhase::Idle),
            started: CloseOnce::new(),
            terminal_error: Mutex::new(None),
            _error_marker: std::marker::PhantomData,
        }
    }

    #[must_use]
    pub fn phase(&self) -> RelayerPhase {
        *self.phase.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn set_phase(&self, phase: RelayerPhase) {
        *self.phase.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = phase;
    }

    /// Subscribes to `topic`. See [`Registry::subscribe`] for close-after-shutdown
    /// semantics.
    pub fn subscribe(&self, topic: MessageType) -> (mpsc::Receiver<Message>, SubscriptionGuard) {
        self.registry.subscribe(topic)
    }

    /// Starts the reader and monitor stages against `source`, both cancelled by a token
    /// derived from `cancel`. Returns [`RelayerError::StartTwice`] if already started.
    ///
    /// # Errors
    ///
    /// Returns [`RelayerError::StartTwice`] if `start` has already been called on this
    /// relayer.
    #[instrument(skip(self, source, cancel))]
    pub fn start<S>(
        self: Arc<Self>,
        mut source: S,
        cancel: CancellationToken,
    ) -> Result<(RelayerHandle, mpsc::Receiver<ReportedError<E>>), RelayerError>
    where
        S: SourceAdapter<Error = E> + 'static,
    {
        if !self.started.try_claim() {
            return Err(RelayerError::StartTwice);
        }
        self.set_phase(RelayerPhase::Running);

        let mut controller = LifecycleController::new(&cancel);
        let (heartbeat_tx, heartbeat_rx) = mpsc::channel::<()>(1);
        // Capacity 2: a fatal read error and its restart-failure follow-up can be
        // reported back-to-back with no intervening drain.
        let (error_tx, error_rx) = mpsc::channel::<ReportedError<E>>(2);
        let (terminated_tx, terminated_rx) = oneshot::channel();

        let reader_cancel = controller.cancel_token();
        let reader_relayer = Arc::clone(&self);
        controller.spawn(async move {
            reader_relayer.run_reader(&mut source, &reader_cancel, heartbeat_tx, error_tx).await;
        });

        let monitor_cancel = controller.cancel_token();
        let monitor_relayer = Arc::clone(&self);
        controller.spawn(async move {
            monitor_relayer.run_monitor(&monitor_cancel, heartbeat_rx).await;
        });

        let relayer = Arc::clone(&self);
        let phase_token = controller.cancel_token();
        tokio::spawn(async move {
            phase_token.cancelled().await;
            relayer.set_phase(RelayerPhase::Draining);
            controller.shutdown(&relayer.registry).await;
            let outcome = relayer
                .terminal_error
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .take()
                .map_or(Ok(()), Err);
            relayer.set_phase(RelayerPhase::Terminated);
            let _ = terminated_tx.send(outcome);
        });

        Ok((RelayerHandle { terminated: terminated_rx }, error_rx))
    }

    #[instrument(skip(self, source, cancel, heartbeat_tx, error_tx))]
    async fn run_reader<S>(
        &self,
        source: &mut S,
        cancel: &CancellationToken,
        heartbeat_tx: mpsc::Sender<()>,
        error_tx: mpsc::Sender<ReportedError<E>>,
    ) where
        S: SourceAdapter<Error = E>,
    {
        let mut ticker = tokio::time::interval(self.config.tick_period);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("reader stage cancelled");
                    return;
                }
                _ = ticker.tick() => {}
            }

            tokio::select! {
                () = cancel.cancelled() => {
                    info!("reader stage cancelled mid-read");
                    return;
                }
                result = source.read() => match result {
                    Ok(msg) => {
                        let topic = msg.topic;
                        if let Some(mailbox) = self.mailboxes.get(&topic) {
                            mailbox.add(msg);
                            debug!(?topic, "message enqueued");
                        } else {
                            warn!(?topic, "message for unknown topic dropped");
                        }
                        let _ = offer_or_drop(&heartbeat_tx, ());
                    }
                    Err(err) => {
                        let fatal = err.is_fatal();
                        if fatal {
                            warn!("fatal source error, attempting restart");
                        }
                        let _ = offer_or_drop(&error_tx, ReportedError { error: err, fatal });
                        if fatal {
                            if let Err(restart_err) = source.restart().await {
                                warn!(error = %restart_err, "source restart failed, fail-stopping");
                                let reason = restart_err.to_string();
                                let _ = offer_or_drop(
                                    &error_tx,
                                    ReportedError { error: restart_err, fatal: true },
                                );
                                *self.terminal_error.lock().unwrap_or_else(std::sync::PoisonError::into_inner) =
                                    Some(RelayerError::RestartExhausted { reason });
                                cancel.cancel();
                                return;
                            }
                            info!("source restarted successfully");
                        }
                    }
                },
            }
        }
    }

    #[instrument(skip(self, cancel, heartbeat_rx))]
    async fn run_monitor(&self, cancel: &CancellationToken, mut heartbeat_rx: mpsc::Receiver<()>) {
        loop {
            if take_n(cancel, &mut heartbeat_rx, 1).await.is_empty() {
                info!("monitor stage cancelled or heartbeat channel closed");
                break;
            }
            self.drain_and_notify();
        }

        // Drain any final batch so the last tick before cancellation isn't lost.
        self.drain_and_notify();
    }

    fn drain_and_notify(&self) {
        for (topic, mailbox) in &self.mailboxes {
            let drained = mailbox.drain();
            if drained.is_empty() {
                continue;
            }
            debug!(?topic, count = drained.len(), "draining batch");
            for msg in drained {
                self.registry.notify(&msg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayerConfig;
    use crate::source::SourceError;
    use std::time::Duration;

    #[derive(Debug, thiserror::Error)]
    #[error("scripted error")]
    struct TestError { fatal: bool }

    impl SourceError for TestError {
        fn is_fatal(&self) -> bool { self.fatal }
    }

    struct ScriptedSource {
        script: std::vec::IntoIter<Result<Message, TestError>>,
        restart_ok: bool,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<Message, TestError>>) -> Self {
            Self { script: script.into_iter(), restart_ok: true }
        }
    }

    #[async_trait::async_trait]
    impl SourceAdapter for ScriptedSource {
        type Error = TestError;

        async fn read(&mut self) -> Result<Message, Self::Error> {
            match self.script.next() {
                Some(result) => result,
                None => std::future::pending().await,
            }
        }

        async fn restart(&mut self) -> Result<(), Self::Error> {
            if self.restart_ok {
                Ok(())
            } else {
                Err(TestError { fatal: true })
            }
        }
    }

    fn fast_config() -> RelayerConfig {
        RelayerConfig { mailbox_capacity: 100, tick_period: Duration::from_millis(5), subscriber_buffer: 4 }
    }

    #[tokio::test]
    async fn single_subscriber_receives_all_matching() {
        let relayer = Arc::new(Relayer::<TestError>::new(fast_config()));
        let (mut rx, _guard) = relayer.subscribe(MessageType::StartNewRound);

        let source = ScriptedSource::new(vec![
            Ok(Message::new(MessageType::StartNewRound, b"a".to_vec())),
            Ok(Message::new(MessageType::StartNewRound, b"b".to_vec())),
            Ok(Message::new(MessageType::ReceivedAnswer, b"c".to_vec())),
        ]);

        let cancel = CancellationToken::new();
        let (handle, _errors) = Arc::clone(&relayer).start(source, cancel.clone()).unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.topic, MessageType::StartNewRound);
        assert_eq!(second.topic, MessageType::StartNewRound);

        cancel.cancel();
        assert!(handle.terminated.await.unwrap().is_ok());
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn double_start_returns_error() {
        let relayer = Arc::new(Relayer::<TestError>::new(fast_config()));
        let source_a = ScriptedSource::new(vec![]);
        let source_b = ScriptedSource::new(vec![]);
        let cancel = CancellationToken::new();

        let first = Arc::clone(&relayer).start(source_a, cancel.clone());
        assert!(first.is_ok());
        let second = Arc::clone(&relayer).start(source_b, cancel.clone());
        assert!(matches!(second, Err(RelayerError::StartTwice)));

        cancel.cancel();
        assert!(first.unwrap().0.terminated.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn fatal_error_triggers_restart_and_continues() {
        let relayer = Arc::new(Relayer::<TestError>::new(fast_config()));
        let (mut snr_rx, _snr_guard) = relayer.subscribe(MessageType::StartNewRound);
        let (mut ra_rx, _ra_guard) = relayer.subscribe(MessageType::ReceivedAnswer);

        let source = ScriptedSource::new(vec![
            Err(TestError { fatal: true }),
            Ok(Message::new(MessageType::StartNewRound, b"a".to_vec())),
            Ok(Message::new(MessageType::ReceivedAnswer, b"b".to_vec())),
        ]);

        let cancel = CancellationToken::new();
        let (handle, mut errors) = Arc::clone(&relayer).start(source, cancel.clone()).unwrap();

        let reported = errors.recv().await.unwrap();
        assert!(reported.fatal);

        assert!(snr_rx.recv().await.is_some());
        assert!(ra_rx.recv().await.is_some());

        cancel.cancel();
        assert!(handle.terminated.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn restart_failure_fail_stops() {
        let relayer = Arc::new(Relayer::<TestError>::new(fast_config()));
        let mut source = ScriptedSource::new(vec![Err(TestError { fatal: true })]);
        source.restart_ok = false;

        let cancel = CancellationToken::new();
        let (handle, mut errors) = Arc::clone(&relayer).start(source, cancel).unwrap();

        let first = errors.recv().await.unwrap();
        assert!(first.fatal);
        let second = errors.recv().await.unwrap();
        assert!(second.fatal);

        let outcome = handle.terminated.await.unwrap();
        assert!(matches!(outcome, Err(RelayerError::RestartExhausted { .. })));
        assert_eq!(relayer.phase(), RelayerPhase::Terminated);
    }
}
