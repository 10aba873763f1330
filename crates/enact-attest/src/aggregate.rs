// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregating a version's attestations into a trust summary.
//!
//! Unlike a receipt chain, attestations for a single version are additive
//! and unordered: any number of auditors may attest under any role, and an
//! attestation is retracted by setting [`Attestation::revoked`], never by
//! removal. [`AttestationSet`] folds a version's attestation list into the
//! counts a trust policy needs.

use enact_core::{Attestation, AttestationRole};
use std::collections::BTreeMap;

/// Per-role, non-revoked, verified attestation counts for one tool version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustSummary {
    /// Verified, non-revoked attestation counts keyed by role.
    pub verified_by_role: BTreeMap<AttestationRole, usize>,
    /// Total attestations considered, including unverified and revoked ones.
    pub total: usize,
    /// Number of attestations excluded from `verified_by_role` because they
    /// are revoked.
    pub revoked: usize,
}

impl TrustSummary {
    /// Count of verified, non-revoked attestations under `role`.
    #[must_use]
    pub fn verified_count(&self, role: AttestationRole) -> usize {
        self.verified_by_role.get(&role).copied().unwrap_or(0)
    }

    /// `true` if at least one verified, non-revoked attestation exists under `role`.
    #[must_use]
    pub fn has_verified(&self, role: AttestationRole) -> bool {
        self.verified_count(role) > 0
    }
}

/// A version's full set of attestations, additive and order-independent.
#[derive(Debug, Clone, Default)]
pub struct AttestationSet {
    attestations: Vec<Attestation>,
}

impl AttestationSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from an existing list, e.g. loaded from storage.
    #[must_use]
    pub fn from_vec(attestations: Vec<Attestation>) -> Self {
        Self { attestations }
    }

    /// Add an attestation to the set.
    pub fn add(&mut self, attestation: Attestation) {
        self.attestations.push(attestation);
    }

    /// All attestations in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[Attestation] {
        &self.attestations
    }

    /// Fold the set into a [`TrustSummary`].
    #[must_use]
    pub fn summarize(&self) -> TrustSummary {
        let mut summary = TrustSummary {
            total: self.attestations.len(),
            ..Default::default()
        };
        for att in &self.attestations {
            if att.revoked {
                summary.revoked += 1;
                continue;
            }
            if att.verified {
                *summary.verified_by_role.entry(att.role).or_insert(0) += 1;
            }
        }
        summary
    }
}
