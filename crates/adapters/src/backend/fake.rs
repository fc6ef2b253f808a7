// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake lock backend for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use async_trait::async_trait;
use lockedb_core::{BackendError, HolderToken, KeyWatch, LockBackend, MemoryBackend};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Backend operation, used to target injected failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    TryClaim,
    Release,
    IsHeld,
    IsClaimable,
    Subscribe,
}

/// Recorded backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    TryClaim {
        key: String,
        holder: HolderToken,
        password: Option<String>,
    },
    Release {
        key: String,
        holder: HolderToken,
    },
    IsHeld {
        key: String,
    },
    IsClaimable {
        key: String,
        password: Option<String>,
    },
    Subscribe {
        key: String,
    },
}

impl BackendCall {
    pub fn op(&self) -> BackendOp {
        match self {
            BackendCall::TryClaim { .. } => BackendOp::TryClaim,
            BackendCall::Release { .. } => BackendOp::Release,
            BackendCall::IsHeld { .. } => BackendOp::IsHeld,
            BackendCall::IsClaimable { .. } => BackendOp::IsClaimable,
            BackendCall::Subscribe { .. } => BackendOp::Subscribe,
        }
    }
}

#[derive(Default)]
struct FakeState {
    calls: Vec<BackendCall>,
    failures: HashMap<BackendOp, VecDeque<BackendError>>,
    grant_delay: Option<Duration>,
}

/// In-memory backend that records calls and can inject failures
///
/// Claims are applied to a real [`MemoryBackend`], so contention and
/// release notifications behave as they would in production.
#[derive(Clone, Default)]
pub struct FakeBackend {
    memory: MemoryBackend,
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// The backing store, for arranging holders directly
    pub fn memory(&self) -> &MemoryBackend {
        &self.memory
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<BackendCall> {
        self.state().calls.clone()
    }

    /// Recorded calls of one kind
    pub fn calls_to(&self, op: BackendOp) -> Vec<BackendCall> {
        self.state()
            .calls
            .iter()
            .filter(|call| call.op() == op)
            .cloned()
            .collect()
    }

    /// Fail the next call to `op` with `error`; queued failures are used in order
    pub fn fail_next(&self, op: BackendOp, error: BackendError) {
        self.state().failures.entry(op).or_default().push_back(error);
    }

    /// Delay every `try_claim` answer by `delay` after the claim was applied
    pub fn set_grant_delay(&self, delay: Option<Duration>) {
        self.state().grant_delay = delay;
    }

    pub fn holders(&self, key: &str) -> Vec<HolderToken> {
        self.memory.holders(key)
    }

    pub fn force_release(&self, key: &str) -> bool {
        self.memory.force_release(key)
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record `call` and hand back any failure queued for it
    fn record(&self, call: BackendCall) -> Result<(), BackendError> {
        let mut state = self.state();
        let op = call.op();
        state.calls.push(call);
        match state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LockBackend for FakeBackend {
    async fn try_claim(
        &self,
        key: &str,
        holder: &HolderToken,
        password: Option<&str>,
    ) -> Result<bool, BackendError> {
        self.record(BackendCall::TryClaim {
            key: key.to_string(),
            holder: holder.clone(),
            password: password.map(str::to_string),
        })?;
        let granted = self.memory.try_claim(key, holder, password).await?;
        let delay = self.state().grant_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(granted)
    }

    async fn release(&self, key: &str, holder: &HolderToken) -> Result<bool, BackendError> {
        self.record(BackendCall::Release {
            key: key.to_string(),
            holder: holder.clone(),
        })?;
        self.memory.release(key, holder).await
    }

    async fn is_held(&self, key: &str) -> Result<bool, BackendError> {
        self.record(BackendCall::IsHeld {
            key: key.to_string(),
        })?;
        self.memory.is_held(key).await
    }

    async fn is_claimable(
        &self,
        key: &str,
        password: Option<&str>,
    ) -> Result<bool, BackendError> {
        self.record(BackendCall::IsClaimable {
            key: key.to_string(),
            password: password.map(str::to_string),
        })?;
        self.memory.is_claimable(key, password).await
    }

    async fn subscribe(&self, key: &str) -> Result<KeyWatch, BackendError> {
        self.record(BackendCall::Subscribe {
            key: key.to_string(),
        })?;
        self.memory.subscribe(key).await
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
