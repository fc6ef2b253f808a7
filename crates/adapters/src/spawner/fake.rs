// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recording spawner for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use lockedb_core::{Spawner, TaskHandle};
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Spawner that records task names and runs tasks on the ambient runtime
///
/// Must be used from within a tokio runtime.
#[derive(Clone, Default)]
pub struct FakeSpawner {
    spawned: Arc<Mutex<Vec<&'static str>>>,
}

impl FakeSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of every task spawned so far, in order
    pub fn spawned(&self) -> Vec<&'static str> {
        self.spawned.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.spawned().iter().filter(|n| **n == name).count()
    }
}

impl Spawner for FakeSpawner {
    fn spawn<F, T>(&self, name: &'static str, task: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.spawned
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(name);
        TaskHandle::from_join(tokio::spawn(task))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
