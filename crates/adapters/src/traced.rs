// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced backend wrapper for consistent observability

use async_trait::async_trait;
use lockedb_core::{BackendError, HolderToken, KeyWatch, LockBackend};
use std::time::Instant;
use tracing::Instrument;

/// Wrapper that adds tracing to any LockBackend
#[derive(Clone, Debug)]
pub struct TracedBackend<B> {
    inner: B,
}

impl<B> TracedBackend<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

#[async_trait]
impl<B: LockBackend> LockBackend for TracedBackend<B> {
    async fn try_claim(
        &self,
        key: &str,
        holder: &HolderToken,
        password: Option<&str>,
    ) -> Result<bool, BackendError> {
        let span = tracing::info_span!("backend.try_claim", key, holder = %holder);
        async {
            tracing::debug!(shared = password.is_some(), "claiming");

            let start = Instant::now();
            let result = self.inner.try_claim(key, holder, password).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(true) => tracing::debug!(elapsed_ms, "claim granted"),
                Ok(false) => tracing::debug!(elapsed_ms, "claim refused"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "claim failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn release(&self, key: &str, holder: &HolderToken) -> Result<bool, BackendError> {
        let span = tracing::info_span!("backend.release", key, holder = %holder);
        async {
            let start = Instant::now();
            let result = self.inner.release(key, holder).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            // A denied release usually means the claim was already gone
            match &result {
                Ok(true) => tracing::info!(elapsed_ms, "released"),
                Ok(false) => tracing::warn!(elapsed_ms, "release denied"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "release failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn is_held(&self, key: &str) -> Result<bool, BackendError> {
        let result = self.inner.is_held(key).await;
        tracing::trace!(key, held = ?result.as_ref().ok(), "checked");
        result
    }

    async fn is_claimable(
        &self,
        key: &str,
        password: Option<&str>,
    ) -> Result<bool, BackendError> {
        let result = self.inner.is_claimable(key, password).await;
        tracing::trace!(key, claimable = ?result.as_ref().ok(), "checked");
        result
    }

    async fn subscribe(&self, key: &str) -> Result<KeyWatch, BackendError> {
        let result = self.inner.subscribe(key).await;
        if let Err(e) = &result {
            tracing::warn!(key, error = %e, "subscribe failed");
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
