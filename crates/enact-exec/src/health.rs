// SPDX-License-Identifier: MIT OR Apache-2.0
//! Health tracking for the execution engine: consecutive failures and last
//! success, surfaced via `health()`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time health snapshot of the execution engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// `true` iff the most recent execution succeeded.
    pub healthy: bool,
    /// The configured container runtime's name (e.g. `"docker"`).
    pub runtime: String,
    /// When the last successful execution completed, if any.
    pub last_success: Option<DateTime<Utc>>,
    /// Number of consecutive failures since the last success.
    pub consecutive_failures: u32,
    /// Error message from the most recent failure, if the engine is unhealthy.
    pub error: Option<String>,
}

/// Tracks consecutive failures and last success across executions.
#[derive(Debug, Clone)]
pub struct HealthTracker {
    runtime: String,
    last_success: Option<DateTime<Utc>>,
    consecutive_failures: u32,
    last_error: Option<String>,
}

impl HealthTracker {
    /// A tracker with no execution history yet.
    #[must_use]
    pub fn new(runtime: impl Into<String>) -> Self {
        Self {
            runtime: runtime.into(),
            last_success: None,
            consecutive_failures: 0,
            last_error: None,
        }
    }

    /// Record a successful execution at `at`.
    pub fn record_success(&mut self, at: DateTime<Utc>) {
        self.last_success = Some(at);
        self.consecutive_failures = 0;
        self.last_error = None;
    }

    /// Record a failed execution with `error`.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.consecutive_failures += 1;
        self.last_error = Some(error.into());
    }

    /// Current health snapshot.
    #[must_use]
    pub fn health(&self) -> Health {
        Health {
            healthy: self.consecutive_failures == 0,
            runtime: self.runtime.clone(),
            last_success: self.last_success,
            consecutive_failures: self.consecutive_failures,
            error: self.last_error.clone(),
        }
    }
}
