// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawner abstraction over the async task pool

use crate::error::LockError;
use std::future::Future;
use std::sync::OnceLock;
use thiserror::Error;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Runs futures independently of the caller
pub trait Spawner: Clone + Send + Sync + 'static {
    /// Spawn a detached task; `name` labels its tracing span
    fn spawn<F, T>(&self, name: &'static str, task: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static;
}

/// Why a spawned task did not produce its output
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskFailure {
    #[error("task was aborted")]
    Aborted,
    #[error("task panicked")]
    Panicked,
}

/// Handle to a spawned task
#[derive(Debug)]
pub struct TaskHandle<T> {
    inner: JoinHandle<T>,
}

impl<T> TaskHandle<T> {
    pub fn from_join(inner: JoinHandle<T>) -> Self {
        Self { inner }
    }

    /// Abort the task at its next suspension point
    pub fn abort(&self) {
        self.inner.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Wait for the task; panics inside it are reported, not resumed
    pub async fn join(self) -> Result<T, TaskFailure> {
        self.inner.await.map_err(|e| {
            if e.is_panic() {
                TaskFailure::Panicked
            } else {
                TaskFailure::Aborted
            }
        })
    }
}

/// Spawner backed by a tokio runtime handle
#[derive(Clone, Debug)]
pub struct TokioSpawner {
    handle: Handle,
}

static SHARED_RUNTIME: OnceLock<Result<Runtime, String>> = OnceLock::new();

impl TokioSpawner {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Spawner for the runtime the caller is running on
    pub fn current() -> Result<Self, LockError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| LockError::Runtime(e.to_string()))
    }

    /// Spawner for the process-wide pool
    ///
    /// The pool is built on first use and lives until the process exits.
    pub fn shared() -> Result<Self, LockError> {
        let runtime = SHARED_RUNTIME.get_or_init(|| {
            Builder::new_multi_thread()
                .thread_name("lockedb-worker")
                .enable_all()
                .build()
                .map_err(|e| e.to_string())
        });
        match runtime {
            Ok(runtime) => Ok(Self::new(runtime.handle().clone())),
            Err(message) => Err(LockError::Runtime(message.clone())),
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Spawner for TokioSpawner {
    fn spawn<F, T>(&self, name: &'static str, task: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let span = tracing::debug_span!("task", name);
        TaskHandle::from_join(self.handle.spawn(task.instrument(span)))
    }
}

#[cfg(test)]
#[path = "spawner_tests.rs"]
mod tests;
