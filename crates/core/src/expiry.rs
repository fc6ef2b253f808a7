// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Expiration-removal policy
//!
//! A timer is armed only once its attempt resolved as acquired, and it is
//! cancelled by an explicit release. When it fires it may still find the
//! lock in a different phase (a concurrent release, a new attempt), so it
//! re-checks the phase before releasing.

use crate::lifecycle::Phase;

/// What a fired expiration timer should do
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpiryAction {
    /// The hold won by the bound attempt is still in place
    Release,
    /// Nothing to release for the bound attempt
    Skip,
}

/// Decide whether the timer bound to `attempt` should release the lock
pub fn decide(phase: Phase, attempt: u64) -> ExpiryAction {
    match phase {
        Phase::Held { attempt: held } if held == attempt => ExpiryAction::Release,
        _ => ExpiryAction::Skip,
    }
}
