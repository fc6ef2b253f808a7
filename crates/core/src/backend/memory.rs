// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process backend
//!
//! Shares lock state between every [`crate::Lock`] built on clones of the same
//! backend. Useful for tests and for coordinating tasks within one process.

use super::{HolderToken, KeyEvent, KeyWatch, LockBackend};
use crate::error::BackendError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Current claim on a key
#[derive(Clone, Debug)]
struct Claim {
    password: Option<String>,
    /// Never empty while the claim exists
    holders: Vec<HolderToken>,
}

impl Claim {
    fn admits(&self, password: Option<&str>) -> bool {
        matches!((self.password.as_deref(), password), (Some(held), Some(offered)) if held == offered)
    }
}

/// Backend keeping claims in memory
#[derive(Clone)]
pub struct MemoryBackend {
    claims: Arc<Mutex<HashMap<String, Claim>>>,
    events: broadcast::Sender<KeyEvent>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Backend whose release feed buffers `capacity` events per subscriber
    pub fn with_event_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            claims: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }

    fn claims(&self) -> MutexGuard<'_, HashMap<String, Claim>> {
        self.claims.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, key: &str, by: Option<HolderToken>) {
        // No subscribers is fine
        let _ = self.events.send(KeyEvent::Released {
            key: key.to_string(),
            by,
        });
    }

    /// Tokens currently holding `key`
    pub fn holders(&self, key: &str) -> Vec<HolderToken> {
        self.claims()
            .get(key)
            .map(|claim| claim.holders.clone())
            .unwrap_or_default()
    }

    /// Drop every claim on `key` regardless of holder
    ///
    /// Returns whether the key was held.
    pub fn force_release(&self, key: &str) -> bool {
        let removed = self.claims().remove(key).is_some();
        if removed {
            tracing::info!(key, "claim force-released");
            self.publish(key, None);
        }
        removed
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("keys", &self.claims().len())
            .finish()
    }
}

#[async_trait]
impl LockBackend for MemoryBackend {
    async fn try_claim(
        &self,
        key: &str,
        holder: &HolderToken,
        password: Option<&str>,
    ) -> Result<bool, BackendError> {
        let mut claims = self.claims();
        match claims.get_mut(key) {
            None => {
                claims.insert(
                    key.to_string(),
                    Claim {
                        password: password.map(str::to_string),
                        holders: vec![holder.clone()],
                    },
                );
                Ok(true)
            }
            Some(claim) if claim.holders.contains(holder) => Ok(true),
            Some(claim) if claim.admits(password) => {
                claim.holders.push(holder.clone());
                Ok(true)
            }
            Some(_) => Ok(false),
        }
    }

    async fn release(&self, key: &str, holder: &HolderToken) -> Result<bool, BackendError> {
        let freed = {
            let mut claims = self.claims();
            let Some(claim) = claims.get_mut(key) else {
                return Ok(true);
            };
            let Some(index) = claim.holders.iter().position(|h| h == holder) else {
                return Ok(false);
            };
            claim.holders.remove(index);
            if claim.holders.is_empty() {
                claims.remove(key);
                true
            } else {
                false
            }
        };
        if freed {
            self.publish(key, Some(holder.clone()));
        }
        Ok(true)
    }

    async fn is_held(&self, key: &str) -> Result<bool, BackendError> {
        Ok(self.claims().contains_key(key))
    }

    async fn is_claimable(
        &self,
        key: &str,
        password: Option<&str>,
    ) -> Result<bool, BackendError> {
        Ok(self
            .claims()
            .get(key)
            .map_or(true, |claim| claim.admits(password)))
    }

    async fn subscribe(&self, key: &str) -> Result<KeyWatch, BackendError> {
        Ok(KeyWatch::new(key, self.events.subscribe()))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
