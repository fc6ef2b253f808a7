// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delayed-task scheduler
//!
//! Each scheduled callback sleeps on its own spawned task. Cancellation is
//! cooperative: it is observed while the task sleeps, and a callback that
//! has already started always runs to completion.

use super::spawner::{Spawner, TaskFailure, TaskHandle};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

/// How a scheduled task ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// The delay elapsed and the callback ran
    Fired,
    /// Cancelled (or aborted) before the delay elapsed; the callback never ran
    Cancelled,
    /// The callback panicked
    Panicked,
}

/// Handle to a callback scheduled with [`Scheduler::after`]
///
/// Dropping the handle detaches the task without cancelling it.
#[derive(Debug)]
pub struct ScheduledTask {
    cancel: watch::Sender<bool>,
    handle: TaskHandle<Completion>,
}

impl ScheduledTask {
    /// Prevent the callback from running if it has not started yet
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task to fire or observe its cancellation
    pub async fn wait(self) -> Completion {
        match self.handle.join().await {
            Ok(completion) => completion,
            Err(TaskFailure::Aborted) => Completion::Cancelled,
            Err(TaskFailure::Panicked) => Completion::Panicked,
        }
    }
}

/// Schedules callbacks on a [`Spawner`] after a delay
#[derive(Clone, Debug)]
pub struct Scheduler<S> {
    spawner: S,
}

impl<S: Spawner> Scheduler<S> {
    pub fn new(spawner: S) -> Self {
        Self { spawner }
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    /// Run `callback` once `delay` has elapsed
    pub fn after<F, Fut>(&self, delay: Duration, callback: F) -> ScheduledTask
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (cancel, mut cancelled) = watch::channel(false);
        let handle = self.spawner.spawn("scheduled", async move {
            let cancel_requested = async move {
                while cancelled.changed().await.is_ok() {
                    if *cancelled.borrow_and_update() {
                        return;
                    }
                }
                // Handle dropped without cancelling: keep sleeping
                std::future::pending::<()>().await
            };
            tokio::select! {
                biased;
                () = cancel_requested => {
                    tracing::trace!(?delay, "scheduled task cancelled");
                    return Completion::Cancelled;
                }
                () = tokio::time::sleep(delay) => {}
            }
            callback().await;
            Completion::Fired
        });
        ScheduledTask { cancel, handle }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
