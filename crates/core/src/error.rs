// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for lock configuration, backends and lifecycle operations

use std::path::PathBuf;
use thiserror::Error;

/// Invalid or unreadable lock configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("lock key must not be empty")]
    EmptyKey,
    #[error("failed to read lock config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid lock config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failure reported by a backend collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("backend operation on {key} failed: {message}")]
    Operation { key: String, message: String },
}

/// Errors returned by [`crate::Lock`] operations
///
/// Timeouts and preemption are not errors; they are
/// [`crate::AcquireOutcome`] values.
#[derive(Debug, Error)]
pub enum LockError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("acquire already in progress for {key}")]
    AcquireInProgress { key: String },
    #[error("lock {key} is already held by this instance")]
    AlreadyHeld { key: String },
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("task runtime unavailable: {0}")]
    Runtime(String),
}
