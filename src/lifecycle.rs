// Copyright (c) 2025. Licensed under Apache License, Version 2.0.

//! The lifecycle controller: derives the cancellation tree for one `start()` call, joins
//! every spawned stage on a barrier, and drives the fixed shutdown order. See
//! [`LifecycleController`].

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::registry::Registry;

/// Owns the derived cancel token for a single `start()` call and the set of tasks spawned
/// under it.
///
/// Shutdown order (see `SPEC_FULL.md` §4.G): external cancel fires the derived token,
/// every stage observes it and returns, the barrier below joins all of them, then the
/// registry is closed (closing every subscriber channel) before `terminated` fires. The
/// controller never closes the registry before every stage has actually returned — a
/// stage racing ahead of that close would otherwise be able to observe subscriber sends
/// silently failing against channels that were never really theirs to close.
pub struct LifecycleController {
    cancel: CancellationToken,
    tasks: JoinSet<()>,
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("pending_tasks", &self.tasks.len())
            .finish()
    }
}

impl LifecycleController {
    /// Derives a child token from `parent` — cancelling `parent` cancels every stage
    /// spawned under this controller, but cancelling the derived token never reaches back
    /// up to `parent`.
    #[must_use]
    pub fn new(parent: &CancellationToken) -> Self {
        Self { cancel: parent.child_token(), tasks: JoinSet::new() }
    }

    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken { self.cancel.clone() }

    /// Registers a stage's future on the join barrier. The controller polls it to
    /// completion as part of [`LifecycleController::shutdown`].
    pub fn spawn<F>(&mut self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(future);
    }

    /// Waits for every spawned stage to return, then closes `registry`. Consumes the
    /// controller — a barrier only runs once. The caller fires `terminated` after this
    /// returns, carrying whatever terminal outcome it observed.
    pub async fn shutdown(mut self, registry: &Registry) {
        while self.tasks.join_next().await.is_some() {}
        info!("all stages joined, closing registry");
        registry.close();
    }
}
