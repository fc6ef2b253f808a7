// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock lifecycle state machine
//!
//! `Idle -> Acquiring -> {Held, TimedOut, Preempted}`, and
//! `Held -> Releasing -> Released`. Every phase past `Idle` carries the
//! attempt number it belongs to, so late inputs from an older attempt are
//! rejected instead of corrupting the current one.

use thiserror::Error;

/// Result of one acquisition attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AcquireOutcome {
    /// The backend granted the hold within the timeout
    Acquired,
    /// The timeout elapsed without a grant
    TimedOut,
    /// The key was released by someone else while this attempt waited
    ReleasedElsewhere,
}

impl AcquireOutcome {
    pub fn is_acquired(self) -> bool {
        matches!(self, AcquireOutcome::Acquired)
    }
}

impl std::fmt::Display for AcquireOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AcquireOutcome::Acquired => "acquired",
            AcquireOutcome::TimedOut => "timed_out",
            AcquireOutcome::ReleasedElsewhere => "released_elsewhere",
        };
        f.write_str(name)
    }
}

/// Lifecycle phase of a lock instance
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Acquiring { attempt: u64 },
    Held { attempt: u64 },
    Releasing { attempt: u64 },
    TimedOut { attempt: u64 },
    Preempted { attempt: u64 },
    Released { attempt: u64 },
}

impl Phase {
    /// Attempt this phase belongs to, if any
    pub fn attempt(&self) -> Option<u64> {
        match *self {
            Phase::Idle => None,
            Phase::Acquiring { attempt }
            | Phase::Held { attempt }
            | Phase::Releasing { attempt }
            | Phase::TimedOut { attempt }
            | Phase::Preempted { attempt }
            | Phase::Released { attempt } => Some(attempt),
        }
    }

    pub fn is_held(&self) -> bool {
        matches!(self, Phase::Held { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Acquiring { .. } => "acquiring",
            Phase::Held { .. } => "held",
            Phase::Releasing { .. } => "releasing",
            Phase::TimedOut { .. } => "timed_out",
            Phase::Preempted { .. } => "preempted",
            Phase::Released { .. } => "released",
        }
    }

    /// Pure state transition function
    pub fn transition(&self, input: PhaseInput) -> Result<(Phase, Vec<PhaseEffect>), PhaseError> {
        match input {
            PhaseInput::Begin { attempt } => match *self {
                Phase::Acquiring { .. } => Err(PhaseError::AcquireInProgress),
                Phase::Held { .. } | Phase::Releasing { .. } => Err(PhaseError::AlreadyHeld),
                _ => Ok((Phase::Acquiring { attempt }, Vec::new())),
            },

            PhaseInput::Resolve { attempt, outcome } => {
                self.require(Phase::Acquiring { attempt })?;
                Ok(match outcome {
                    AcquireOutcome::Acquired => (
                        Phase::Held { attempt },
                        vec![PhaseEffect::ArmExpiry { attempt }],
                    ),
                    AcquireOutcome::TimedOut => (Phase::TimedOut { attempt }, Vec::new()),
                    AcquireOutcome::ReleasedElsewhere => {
                        (Phase::Preempted { attempt }, Vec::new())
                    }
                })
            }

            PhaseInput::Abandon { attempt } => {
                self.require(Phase::Acquiring { attempt })?;
                Ok((Phase::Idle, Vec::new()))
            }

            PhaseInput::Release { attempt } => {
                self.require(Phase::Held { attempt })?;
                Ok((Phase::Releasing { attempt }, Vec::new()))
            }

            PhaseInput::Confirm { attempt, released } => {
                self.require(Phase::Releasing { attempt })?;
                // A denied release means the backend no longer counts us as a holder
                let next = if released {
                    Phase::Released { attempt }
                } else {
                    Phase::Idle
                };
                Ok((next, vec![PhaseEffect::CancelExpiry]))
            }

            PhaseInput::ReleaseFailed { attempt } => {
                self.require(Phase::Releasing { attempt })?;
                Ok((Phase::Held { attempt }, Vec::new()))
            }
        }
    }

    fn require(&self, expected: Phase) -> Result<(), PhaseError> {
        if *self == expected {
            Ok(())
        } else {
            Err(PhaseError::Unexpected {
                expected,
                found: *self,
            })
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.attempt() {
            Some(attempt) => write!(f, "{}#{}", self.name(), attempt),
            None => f.write_str(self.name()),
        }
    }
}

/// Inputs driving [`Phase::transition`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseInput {
    /// Start a new acquisition attempt
    Begin { attempt: u64 },
    /// The attempt finished with a defined outcome
    Resolve { attempt: u64, outcome: AcquireOutcome },
    /// The attempt failed or was dropped before resolving
    Abandon { attempt: u64 },
    /// Start releasing the hold won by `attempt`
    Release { attempt: u64 },
    /// The backend answered the release
    Confirm { attempt: u64, released: bool },
    /// The backend failed to answer the release; the hold is unchanged
    ReleaseFailed { attempt: u64 },
}

/// Side effects requested by a transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseEffect {
    /// Start the expiration timer bound to `attempt`
    ArmExpiry { attempt: u64 },
    /// Stop any armed expiration timer
    CancelExpiry,
}

/// Rejected transitions
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PhaseError {
    #[error("an acquisition is already in progress")]
    AcquireInProgress,
    #[error("the lock is already held")]
    AlreadyHeld,
    #[error("expected phase {expected}, found {found}")]
    Unexpected { expected: Phase, found: Phase },
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
