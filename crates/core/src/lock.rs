// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Distributed lock entity
//!
//! A [`Lock`] binds one [`LockConfig`] to a backend and a spawner and drives
//! the [`Phase`] state machine through acquire and release. Clones share the
//! same instance state.

use crate::backend::{HolderToken, LockBackend};
use crate::config::LockConfig;
use crate::error::LockError;
use crate::expiry::{self, ExpiryAction};
use crate::id::{IdGen, UuidIdGen};
use crate::lifecycle::{AcquireOutcome, Phase, PhaseEffect, PhaseError, PhaseInput};
use crate::runtime::{ScheduledTask, Scheduler, Spawner, TaskHandle, TokioSpawner};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::Instrument;

/// A named resource that at most one holder (or one password group) may
/// possess at a time
pub struct Lock<B, S = TokioSpawner, G = UuidIdGen> {
    inner: Arc<Inner<B, S, G>>,
}

struct Inner<B, S, G> {
    id: String,
    config: LockConfig,
    backend: B,
    scheduler: Scheduler<S>,
    tokens: G,
    slot: Mutex<Slot>,
}

/// Mutable per-instance state, never held across an await
#[derive(Default)]
struct Slot {
    phase: Phase,
    attempts: u64,
    /// Holder token of the latest attempt
    token: Option<HolderToken>,
    expiry: Option<ScheduledTask>,
}

impl<B, S, G> Clone for Lock<B, S, G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B, S, G> std::fmt::Debug for Lock<B, S, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lock")
            .field("id", &self.inner.id)
            .field("key", &self.inner.config.key)
            .field("phase", &self.inner.slot().phase)
            .finish()
    }
}

impl<B: LockBackend, S: Spawner> Lock<B, S, UuidIdGen> {
    /// Build a lock, rejecting an invalid configuration before any backend call
    pub fn new(config: LockConfig, backend: B, spawner: S) -> Result<Self, LockError> {
        Self::with_id_gen(config, backend, spawner, UuidIdGen)
    }
}

impl<B: LockBackend, S: Spawner, G: IdGen> Lock<B, S, G> {
    /// Build a lock drawing its id and holder tokens from `ids`
    pub fn with_id_gen(
        config: LockConfig,
        backend: B,
        spawner: S,
        ids: G,
    ) -> Result<Self, LockError> {
        let config = config.validated()?;
        let id = ids.next();
        Ok(Self {
            inner: Arc::new(Inner {
                id,
                config,
                backend,
                scheduler: Scheduler::new(spawner),
                tokens: ids,
                slot: Mutex::new(Slot::default()),
            }),
        })
    }

    /// Process-local identifier, for logs and debugging only
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn key(&self) -> &str {
        &self.inner.config.key
    }

    pub fn password(&self) -> Option<&str> {
        self.inner.config.password()
    }

    pub fn expires_after(&self) -> Option<Duration> {
        self.inner.config.expiry()
    }

    pub fn timeout(&self) -> Duration {
        self.inner.config.timeout
    }

    pub fn config(&self) -> &LockConfig {
        &self.inner.config
    }

    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    /// Current lifecycle phase of this instance
    pub fn phase(&self) -> Phase {
        self.inner.slot().phase
    }

    /// Whether an expiration timer is armed and has not fired or been cancelled
    pub fn expiry_pending(&self) -> bool {
        self.inner
            .slot()
            .expiry
            .as_ref()
            .is_some_and(|timer| !timer.is_cancelled() && !timer.is_finished())
    }

    /// Try to acquire the lock within the configured timeout
    ///
    /// Only one acquisition may be outstanding per instance; a second call
    /// fails with [`LockError::AcquireInProgress`], and calling it while the
    /// lock is held fails with [`LockError::AlreadyHeld`].
    pub async fn acquire(&self) -> Result<AcquireOutcome, LockError> {
        let inner = &self.inner;
        let (attempt, token) = inner.begin()?;
        let span = tracing::info_span!(
            "lock.acquire",
            key = %inner.config.key,
            lock_id = %inner.id,
            attempt
        );
        let mut rollback = Rollback::new(inner, PhaseInput::Abandon { attempt }, Some(token.clone()));

        async move {
            match inner.contend(&token).await {
                Ok(outcome) => {
                    rollback.disarm();
                    inner.resolve(attempt, outcome);
                    Ok(outcome)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "acquire failed");
                    inner.revoke(&token).await;
                    rollback.disarm();
                    inner.settle(PhaseInput::Abandon { attempt });
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Run [`Lock::acquire`] on the spawner instead of the caller's task
    pub fn spawn_acquire(&self) -> TaskHandle<Result<AcquireOutcome, LockError>> {
        let lock = self.clone();
        self.inner
            .scheduler
            .spawner()
            .spawn("lock.acquire", async move { lock.acquire().await })
    }

    /// Release the hold won by the latest acquisition
    ///
    /// Resolves `true` when there was nothing to release. Resolves `false`
    /// when the backend denied the release because this instance is no
    /// longer a holder.
    pub async fn release(&self) -> Result<bool, LockError> {
        let span = tracing::info_span!(
            "lock.release",
            key = %self.inner.config.key,
            lock_id = %self.inner.id
        );
        self.inner.release_hold(None).instrument(span).await
    }

    /// Whether anyone holds the key, this instance or not
    pub async fn is_locked(&self) -> Result<bool, LockError> {
        let held = self.inner.backend.is_held(&self.inner.config.key).await?;
        tracing::trace!(key = %self.inner.config.key, held, "checked lock");
        Ok(held)
    }

    /// Whether an acquisition started now would be granted immediately
    ///
    /// Advisory only: the answer can change before a subsequent acquire.
    pub async fn is_acquirable(&self) -> Result<bool, LockError> {
        let config = &self.inner.config;
        let claimable = self
            .inner
            .backend
            .is_claimable(&config.key, config.password())
            .await?;
        tracing::trace!(key = %config.key, claimable, "checked acquirability");
        Ok(claimable)
    }
}

impl<B, S, G> Inner<B, S, G> {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<B: LockBackend, S: Spawner, G: IdGen> Inner<B, S, G> {
    /// Enter `Acquiring` with a fresh attempt number and holder token
    fn begin(&self) -> Result<(u64, HolderToken), LockError> {
        let mut slot = self.slot();
        let attempt = slot.attempts + 1;
        let (phase, _) = slot
            .phase
            .transition(PhaseInput::Begin { attempt })
            .map_err(|e| match e {
                PhaseError::AcquireInProgress => LockError::AcquireInProgress {
                    key: self.config.key.clone(),
                },
                _ => LockError::AlreadyHeld {
                    key: self.config.key.clone(),
                },
            })?;
        let token = HolderToken::new(self.tokens.next());
        slot.phase = phase;
        slot.attempts = attempt;
        slot.token = Some(token.clone());
        Ok((attempt, token))
    }

    /// Race the claim loop against the timeout
    async fn contend(&self, token: &HolderToken) -> Result<AcquireOutcome, LockError> {
        match tokio::time::timeout(self.config.timeout, self.claim(token)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(timeout = ?self.config.timeout, "acquire timed out");
                // A grant that lands after the deadline must not survive
                self.revoke(token).await;
                Ok(AcquireOutcome::TimedOut)
            }
        }
    }

    async fn claim(&self, token: &HolderToken) -> Result<AcquireOutcome, LockError> {
        let key = self.config.key.as_str();
        let password = self.config.password();
        let mut watch = self.backend.subscribe(key).await?;
        loop {
            if self.backend.try_claim(key, token, password).await? {
                return Ok(AcquireOutcome::Acquired);
            }
            tracing::debug!("key is held, waiting");
            tokio::select! {
                by = watch.released() => {
                    if by.as_ref() != Some(token) {
                        tracing::debug!(by = ?by, "key released while waiting");
                        return Ok(AcquireOutcome::ReleasedElsewhere);
                    }
                }
                () = tokio::time::sleep(self.config.retry_interval) => {}
            }
        }
    }

    /// Best-effort release of `token`'s claim, if any
    async fn revoke(&self, token: &HolderToken) {
        match self.backend.release(&self.config.key, token).await {
            Ok(_) => tracing::debug!(token = %token, "revoked pending claim"),
            Err(e) => tracing::warn!(token = %token, error = %e, "failed to revoke pending claim"),
        }
    }

    fn spawn_revoke(self: &Arc<Self>, token: HolderToken) {
        let inner = Arc::clone(self);
        // Detached; dropping the handle does not stop it
        let _ = self
            .scheduler
            .spawner()
            .spawn("lock.revoke", async move { inner.revoke(&token).await });
    }

    fn resolve(self: &Arc<Self>, attempt: u64, outcome: AcquireOutcome) {
        match outcome {
            AcquireOutcome::Acquired => tracing::info!(key = %self.config.key, "lock acquired"),
            _ => tracing::debug!(key = %self.config.key, %outcome, "lock not acquired"),
        }
        self.settle(PhaseInput::Resolve { attempt, outcome });
    }

    /// Apply a transition and its effects; a rejected input is logged and dropped
    fn settle(self: &Arc<Self>, input: PhaseInput) {
        let mut slot = self.slot();
        match slot.phase.transition(input) {
            Ok((phase, effects)) => {
                slot.phase = phase;
                self.apply(&mut slot, effects);
            }
            Err(e) => tracing::warn!(?input, error = %e, "ignoring stale lifecycle input"),
        }
    }

    fn apply(self: &Arc<Self>, slot: &mut Slot, effects: Vec<PhaseEffect>) {
        for effect in effects {
            match effect {
                PhaseEffect::ArmExpiry { attempt } => {
                    let Some(after) = self.config.expiry() else {
                        continue;
                    };
                    let inner = Arc::clone(self);
                    let timer = self.scheduler.after(after, move || {
                        let span = tracing::info_span!(
                            "lock.expire",
                            key = %inner.config.key,
                            lock_id = %inner.id,
                            attempt
                        );
                        inner.expire(attempt).instrument(span)
                    });
                    if let Some(previous) = slot.expiry.replace(timer) {
                        previous.cancel();
                    }
                }
                PhaseEffect::CancelExpiry => {
                    if let Some(timer) = slot.expiry.take() {
                        timer.cancel();
                    }
                }
            }
        }
    }

    /// Fired by the expiration timer bound to `attempt`
    async fn expire(self: Arc<Self>, attempt: u64) {
        let action = expiry::decide(self.slot().phase, attempt);
        if action == ExpiryAction::Skip {
            tracing::debug!("nothing to expire");
            return;
        }
        tracing::info!("lock expired, releasing");
        // Runs detached from any caller: failures are only logged
        match self.release_hold(Some(attempt)).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!("backend denied expiration release"),
            Err(e) => tracing::error!(error = %e, "expiration release failed"),
        }
    }

    /// Release the current hold, or only the hold won by `bound` if given
    async fn release_hold(self: &Arc<Self>, bound: Option<u64>) -> Result<bool, LockError> {
        let (attempt, token) = {
            let mut slot = self.slot();
            let Phase::Held { attempt } = slot.phase else {
                tracing::debug!(phase = %slot.phase, "nothing to release");
                return Ok(true);
            };
            if bound.is_some_and(|bound| bound != attempt) {
                return Ok(true);
            }
            let Some(token) = slot.token.clone() else {
                return Ok(true);
            };
            match slot.phase.transition(PhaseInput::Release { attempt }) {
                Ok((phase, effects)) => {
                    slot.phase = phase;
                    self.apply(&mut slot, effects);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "release rejected");
                    return Ok(true);
                }
            }
            (attempt, token)
        };

        let mut rollback = Rollback::new(self, PhaseInput::ReleaseFailed { attempt }, None);
        let result = self.backend.release(&self.config.key, &token).await;
        rollback.disarm();

        match result {
            Ok(released) => {
                if released {
                    tracing::info!(key = %self.config.key, "lock released");
                } else {
                    tracing::warn!(key = %self.config.key, "backend denied release");
                }
                self.settle(PhaseInput::Confirm { attempt, released });
                Ok(released)
            }
            Err(e) => {
                self.settle(PhaseInput::ReleaseFailed { attempt });
                Err(e.into())
            }
        }
    }
}

/// Restores the lifecycle when an in-flight operation is dropped mid-await
struct Rollback<'a, B: LockBackend, S: Spawner, G: IdGen> {
    inner: &'a Arc<Inner<B, S, G>>,
    input: Option<PhaseInput>,
    revoke: Option<HolderToken>,
}

impl<'a, B: LockBackend, S: Spawner, G: IdGen> Rollback<'a, B, S, G> {
    fn new(inner: &'a Arc<Inner<B, S, G>>, input: PhaseInput, revoke: Option<HolderToken>) -> Self {
        Self {
            inner,
            input: Some(input),
            revoke,
        }
    }

    fn disarm(&mut self) {
        self.input = None;
        self.revoke = None;
    }
}

impl<B: LockBackend, S: Spawner, G: IdGen> Drop for Rollback<'_, B, S, G> {
    fn drop(&mut self) {
        if let Some(input) = self.input.take() {
            tracing::debug!(?input, "operation dropped before completing");
            self.inner.settle(input);
        }
        if let Some(token) = self.revoke.take() {
            self.inner.spawn_revoke(token);
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
