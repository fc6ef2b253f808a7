// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock configuration
//!
//! A [`LockConfig`] is supplied programmatically or parsed from TOML:
//!
//! ```toml
//! key = "billing/nightly-export"
//! password = "export-workers"
//! expires_after = "30s"
//! timeout = "5s"
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_retry_interval() -> Duration {
    DEFAULT_RETRY_INTERVAL
}

/// Configuration for a single lock instance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockConfig {
    /// Name of the distributed resource
    pub key: String,
    /// Holders presenting the same password may share the lock
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Hold duration before automatic release; zero never expires
    #[serde(default, with = "humantime_serde")]
    pub expires_after: Duration,
    /// How long `acquire` waits for the backend to grant the hold
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    /// Poll interval between claim attempts while contended
    #[serde(default = "default_retry_interval", with = "humantime_serde")]
    pub retry_interval: Duration,
}

impl LockConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            password: None,
            expires_after: Duration::ZERO,
            timeout: DEFAULT_TIMEOUT,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_expires_after(mut self, expires_after: Duration) -> Self {
        self.expires_after = expires_after;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Expiration delay, if the lock expires at all
    pub fn expiry(&self) -> Option<Duration> {
        (!self.expires_after.is_zero()).then_some(self.expires_after)
    }

    /// Password used for re-entrant acquisition, if any
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    /// Check the key and normalize an empty password to none
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.key.trim().is_empty() {
            return Err(ConfigError::EmptyKey);
        }
        if self.password.as_deref() == Some("") {
            self.password = None;
        }
        // A zero interval would spin on the backend while contended
        if self.retry_interval.is_zero() {
            self.retry_interval = DEFAULT_RETRY_INTERVAL;
        }
        Ok(self)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: LockConfig = toml::from_str(content)?;
        config.validated()
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
