// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend capability for persisting lock state
//!
//! The backend is the only shared mutable resource across processes and the
//! sole arbiter of ordering for a key. Implementations must make
//! [`LockBackend::try_claim`] and [`LockBackend::release`] atomic.

mod memory;

pub use memory::MemoryBackend;

use crate::error::BackendError;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Opaque identifier of one claim on a key
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HolderToken(String);

impl HolderToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HolderToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Change notifications published by a backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyEvent {
    /// The key became free through an explicit release
    ///
    /// `by` is `None` for administrative releases.
    Released {
        key: String,
        by: Option<HolderToken>,
    },
}

impl KeyEvent {
    pub fn key(&self) -> &str {
        match self {
            KeyEvent::Released { key, .. } => key,
        }
    }
}

/// Release notifications for a single key
#[derive(Debug)]
pub struct KeyWatch {
    key: String,
    events: Option<broadcast::Receiver<KeyEvent>>,
}

impl KeyWatch {
    pub fn new(key: impl Into<String>, events: broadcast::Receiver<KeyEvent>) -> Self {
        Self {
            key: key.into(),
            events: Some(events),
        }
    }

    /// A watch that never reports anything, for backends that can only be polled
    pub fn polling(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            events: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Wait for the next release of the watched key and report who released it
    ///
    /// Never resolves once the event feed is closed.
    pub async fn released(&mut self) -> Option<HolderToken> {
        while let Some(events) = self.events.as_mut() {
            match events.recv().await {
                Ok(KeyEvent::Released { key, by }) if key == self.key => return by,
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    // Missed releases are caught by the next claim poll
                    tracing::debug!(key = %self.key, skipped, "key watch lagged");
                }
                Err(RecvError::Closed) => self.events = None,
            }
        }
        std::future::pending().await
    }
}

/// Storage/consensus collaborator that durably records key holders
#[async_trait]
pub trait LockBackend: Clone + Send + Sync + 'static {
    /// Claim `key` if it is free, or join the current hold when both
    /// passwords are present and equal
    async fn try_claim(
        &self,
        key: &str,
        holder: &HolderToken,
        password: Option<&str>,
    ) -> Result<bool, BackendError>;

    /// Release `holder`'s claim; succeeds when the key is already free
    async fn release(&self, key: &str, holder: &HolderToken) -> Result<bool, BackendError>;

    /// Whether anyone currently holds `key`
    async fn is_held(&self, key: &str) -> Result<bool, BackendError>;

    /// Whether a claim with `password` would be granted right now
    async fn is_claimable(&self, key: &str, password: Option<&str>)
        -> Result<bool, BackendError>;

    /// Subscribe to release notifications for `key`
    async fn subscribe(&self, key: &str) -> Result<KeyWatch, BackendError>;
}
