// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task substrate shared by every lock instance
//!
//! - **Spawner** - runs detached futures on a pool of cheap tasks
//! - **Scheduler** - runs a callback after a delay, cancellable until it fires

mod scheduler;
mod spawner;

pub use scheduler::{Completion, ScheduledTask, Scheduler};
pub use spawner::{Spawner, TaskFailure, TaskHandle, TokioSpawner};
