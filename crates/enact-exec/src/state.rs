// SPDX-License-Identifier: MIT OR Apache-2.0
//! Execution state machine — tracks and enforces valid transitions through
//! the phases of a single skill run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a single execution, per the engine's phase breakdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    /// Resolving the manifest and its bundle.
    Resolving,
    /// Pulling the base container image.
    Pulling,
    /// Running the manifest's build steps.
    Building,
    /// Running the command inside the container.
    Running,
    /// Execution finished successfully.
    Complete,
    /// Execution finished with a non-build failure.
    Failed,
    /// Execution exceeded its wall-clock deadline.
    TimedOut,
    /// A build step exited non-zero (spec's `build_failed` terminal state).
    BuildFailed,
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Resolving => "resolving",
            Self::Pulling => "pulling",
            Self::Building => "building",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::BuildFailed => "build_failed",
        };
        f.write_str(s)
    }
}

impl ExecutionState {
    /// `true` once the execution has reached a terminal state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Complete | Self::Failed | Self::TimedOut | Self::BuildFailed
        )
    }

    /// Valid next states from `self`.
    #[must_use]
    fn allowed_next(self) -> &'static [ExecutionState] {
        match self {
            Self::Resolving => &[Self::Pulling, Self::Failed],
            Self::Pulling => &[Self::Building, Self::Running, Self::Failed],
            Self::Building => &[Self::Running, Self::BuildFailed],
            Self::Running => &[Self::Complete, Self::Failed, Self::TimedOut],
            Self::Complete | Self::Failed | Self::TimedOut | Self::BuildFailed => &[],
        }
    }
}

/// Raised when a transition does not follow the engine's state machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid execution state transition: {from} -> {to}")]
pub struct InvalidTransition {
    from: ExecutionState,
    to: ExecutionState,
}

/// Tracks the current state of one execution and enforces valid transitions.
#[derive(Debug, Clone)]
pub struct ExecutionTracker {
    state: ExecutionState,
    history: Vec<ExecutionState>,
}

impl ExecutionTracker {
    /// A tracker starting in [`ExecutionState::Resolving`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ExecutionState::Resolving,
            history: vec![ExecutionState::Resolving],
        }
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> ExecutionState {
        self.state
    }

    /// Every state visited, in order, including the current one.
    #[must_use]
    pub fn history(&self) -> &[ExecutionState] {
        &self.history
    }

    /// Attempts to move to `next`, rejecting transitions the state machine
    /// does not allow.
    pub fn transition(&mut self, next: ExecutionState) -> Result<(), InvalidTransition> {
        if !self.state.allowed_next().contains(&next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.history.push(next);
        Ok(())
    }
}

impl Default for ExecutionTracker {
    fn default() -> Self {
        Self::new()
    }
}
