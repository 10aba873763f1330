// SPDX-License-Identifier: MIT OR Apache-2.0
//! Audit trail for trust policy decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ArtifactSource, Decision, PolicyEngine};
use enact_core::Attestation;

/// A single recorded policy evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the evaluation ran.
    pub timestamp: DateTime<Utc>,
    /// `"<tool>@<version>"` the decision was made for.
    pub tool_version_id: String,
    /// Artifact source considered during evaluation.
    pub source: String,
    /// Resulting decision.
    pub decision: Decision,
}

/// Wraps a [`PolicyEngine`] and records every decision for later inspection
/// (e.g. surfacing a "why was this blocked" trail to an operator).
pub struct PolicyAuditor {
    engine: PolicyEngine,
    log: Vec<AuditEntry>,
}

impl PolicyAuditor {
    /// Create a new auditor around the given engine.
    #[must_use]
    pub fn new(engine: PolicyEngine) -> Self {
        Self {
            engine,
            log: Vec::new(),
        }
    }

    /// Evaluate and record a decision for `tool_version_id`.
    pub fn evaluate(
        &mut self,
        tool_version_id: &str,
        source: ArtifactSource,
        attestations: &[Attestation],
    ) -> Decision {
        let decision = self.engine.evaluate(source, attestations);
        self.log.push(AuditEntry {
            timestamp: Utc::now(),
            tool_version_id: tool_version_id.to_string(),
            source: match source {
                ArtifactSource::Local => "local".to_string(),
                ArtifactSource::Registry => "registry".to_string(),
            },
            decision: decision.clone(),
        });
        decision
    }

    /// All recorded entries in chronological order.
    #[must_use]
    pub fn entries(&self) -> &[AuditEntry] {
        &self.log
    }

    /// Number of denied decisions so far.
    #[must_use]
    pub fn denied_count(&self) -> usize {
        self.log.iter().filter(|e| !e.decision.allowed).count()
    }

    /// Number of allowed decisions so far.
    #[must_use]
    pub fn allowed_count(&self) -> usize {
        self.log.iter().filter(|e| e.decision.allowed).count()
    }
}
