// SPDX-License-Identifier: MIT OR Apache-2.0
//! enact-policy
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Trust policy engine: decides whether a fetched artifact is acceptable
//! under a configured policy, by filtering its attestations by algorithm and
//! trusted identity, then checking minimum-count and required-role
//! thresholds. Three named presets cover the common cases; a `local` source
//! may additionally be accepted unsigned via `allow_local_unsigned`.

mod audit;

pub use audit::{AuditEntry, PolicyAuditor};

use enact_core::{Attestation, AttestationRole};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Where an artifact being evaluated came from. Only [`ArtifactSource::Local`]
/// is eligible for the `allow_local_unsigned` bypass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactSource {
    /// Loaded from the user's local tools directory.
    Local,
    /// Fetched from a registry.
    Registry,
}

/// Which identities a policy trusts as attestation signers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrustedAuditors {
    /// Any identity is trusted.
    Any,
    /// Only these `"provider:identity"` strings are trusted.
    Set(BTreeSet<String>),
}

impl TrustedAuditors {
    fn trusts(&self, identity: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Set(set) => set.contains(identity),
        }
    }
}

/// A trust policy: the rules an artifact's attestations must satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TrustPolicy {
    /// Identities trusted to sign attestations.
    pub trusted_auditors: TrustedAuditors,
    /// Minimum number of algorithm-allowed, verified, trusted attestations required.
    pub minimum_attestations: u32,
    /// Roles that must each be represented among the eligible attestations.
    pub required_roles: BTreeSet<AttestationRole>,
    /// Signing algorithms accepted; an attestation signed under any other
    /// algorithm is filtered out before the count and role checks run.
    pub allowed_algorithms: BTreeSet<String>,
    /// Accept a locally-sourced, unsigned (zero-attestation) artifact.
    /// Never applies to registry-sourced artifacts.
    pub allow_local_unsigned: bool,
}

impl TrustPolicy {
    /// `permissive`: at least one valid signature from any trusted identity.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            trusted_auditors: TrustedAuditors::Any,
            minimum_attestations: 1,
            required_roles: BTreeSet::new(),
            allowed_algorithms: ["ed25519".to_string()].into_iter().collect(),
            allow_local_unsigned: true,
        }
    }

    /// `enterprise`: at least two valid signatures, covering author and reviewer.
    #[must_use]
    pub fn enterprise() -> Self {
        Self {
            trusted_auditors: TrustedAuditors::Any,
            minimum_attestations: 2,
            required_roles: [AttestationRole::Author, AttestationRole::Reviewer]
                .into_iter()
                .collect(),
            allowed_algorithms: ["ed25519".to_string()].into_iter().collect(),
            allow_local_unsigned: false,
        }
    }

    /// `paranoid`: at least three valid signatures, covering author, reviewer, and approver.
    #[must_use]
    pub fn paranoid() -> Self {
        Self {
            trusted_auditors: TrustedAuditors::Any,
            minimum_attestations: 3,
            required_roles: [
                AttestationRole::Author,
                AttestationRole::Reviewer,
                AttestationRole::Approver,
            ]
            .into_iter()
            .collect(),
            allowed_algorithms: ["ed25519".to_string()].into_iter().collect(),
            allow_local_unsigned: false,
        }
    }
}

/// Outcome of a trust policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Decision {
    /// Whether the artifact is accepted.
    pub allowed: bool,
    /// Human-readable reason, present when `allowed` is `false`.
    pub reason: Option<String>,
}

impl Decision {
    /// An accepting decision.
    #[must_use]
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    /// A rejecting decision with `reason`.
    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

fn attestation_algorithm(attestation: &Attestation) -> String {
    attestation
        .bundle
        .get("algorithm")
        .and_then(|v| v.as_str())
        .unwrap_or("ed25519")
        .to_string()
}

/// Evaluates artifacts against a [`TrustPolicy`].
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    policy: TrustPolicy,
}

impl PolicyEngine {
    /// Create an engine around `policy`.
    #[must_use]
    pub fn new(policy: TrustPolicy) -> Self {
        Self { policy }
    }

    /// Evaluate whether `attestations` satisfy this engine's policy for an
    /// artifact from `source`.
    #[must_use]
    pub fn evaluate(&self, source: ArtifactSource, attestations: &[Attestation]) -> Decision {
        if matches!(source, ArtifactSource::Local)
            && attestations.is_empty()
            && self.policy.allow_local_unsigned
        {
            return Decision::allow();
        }

        let eligible: Vec<&Attestation> = attestations
            .iter()
            .filter(|a| !a.revoked)
            .filter(|a| a.verified)
            .filter(|a| self.policy.allowed_algorithms.contains(&attestation_algorithm(a)))
            .filter(|a| self.policy.trusted_auditors.trusts(&a.auditor))
            .collect();

        if eligible.len() < self.policy.minimum_attestations as usize {
            return Decision::deny(format!(
                "only {} of {} required attestations are verified and trusted",
                eligible.len(),
                self.policy.minimum_attestations
            ));
        }

        for role in &self.policy.required_roles {
            if !eligible.iter().any(|a| a.role == *role) {
                return Decision::deny(format!("missing required attestation role: {role:?}"));
            }
        }

        Decision::allow()
    }
}
