// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lockedb-core: client-side lifecycle for distributed mutual-exclusion locks
//!
//! This crate provides:
//! - A lock entity with timeout-bounded acquisition, release and liveness queries
//! - A pure lifecycle state machine driving that entity
//! - A shared task substrate and a cancellable delayed-task scheduler
//! - The backend capability trait plus an in-memory reference backend

pub mod config;
pub mod error;
pub mod id;

pub mod backend;
pub mod runtime;

// State machines (order matters for dependencies)
pub mod lifecycle;
pub mod expiry;
pub mod lock;

// Re-exports
pub use backend::{HolderToken, KeyEvent, KeyWatch, LockBackend, MemoryBackend};
pub use config::LockConfig;
pub use error::{BackendError, ConfigError, LockError};
pub use expiry::ExpiryAction;
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use lifecycle::{AcquireOutcome, Phase, PhaseEffect, PhaseError, PhaseInput};
pub use lock::Lock;
pub use runtime::{Completion, ScheduledTask, Scheduler, Spawner, TaskFailure, TaskHandle, TokioSpawner};
