// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pluggable verification: each check is an independent trait so a deployment
//! can swap in a real Fulcio root of trust or a real Rekor client without
//! touching the other two checks or the conjunction logic.

use crate::builder::{decode_envelope, pae, PAYLOAD_TYPE_FOR_VERIFY};
use base64::Engine;
use chrono::Utc;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use enact_core::Attestation;
use std::collections::BTreeMap;

/// Checks the certificate chain embedded in an attestation's signing bundle
/// against a root of trust (e.g. Fulcio). The in-process default accepts
/// everything, since Enact itself doesn't operate a certificate authority.
pub trait CertificateVerifier: Send + Sync {
    /// Returns whether the bundle's certificate chain is trusted.
    fn verify_certificate(&self, bundle: &serde_json::Value) -> bool;
}

/// Checks that the signature over an attestation's payload was produced by a
/// key the verifier trusts.
pub trait SignatureVerifier: Send + Sync {
    /// Returns whether the bundle's signature is valid for its payload.
    fn verify_signature(&self, bundle: &serde_json::Value) -> bool;
}

/// Checks transparency-log inclusion (e.g. Rekor) for an attestation.
pub trait RekorVerifier: Send + Sync {
    /// Returns whether the referenced log entry exists and covers this bundle.
    fn verify_inclusion(&self, bundle: &serde_json::Value, log_id: Option<&str>, log_index: Option<u64>) -> bool;
}

/// A verifier that accepts every certificate chain unconditionally.
///
/// Enact does not run its own certificate authority; deployments that want
/// Fulcio-backed certificate checks provide their own [`CertificateVerifier`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissiveCertificateVerifier;

impl CertificateVerifier for PermissiveCertificateVerifier {
    fn verify_certificate(&self, _bundle: &serde_json::Value) -> bool {
        true
    }
}

/// A verifier that treats any attestation carrying a transparency-log
/// identifier and index as included. Enact does not run its own
/// transparency log; deployments that want real Rekor inclusion proofs
/// provide their own [`RekorVerifier`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PresenceRekorVerifier;

impl RekorVerifier for PresenceRekorVerifier {
    fn verify_inclusion(&self, _bundle: &serde_json::Value, log_id: Option<&str>, log_index: Option<u64>) -> bool {
        log_id.is_some() && log_index.is_some()
    }
}

/// A verifier that accepts any structurally well-formed signature entry
/// (non-empty `keyid` and `sig`) without checking it cryptographically.
///
/// Used where no keyring is configured, e.g. a registry deployment that
/// doesn't yet operate its own key-distribution service; deployments that
/// want real cryptographic checks provide an [`Ed25519SignatureVerifier`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissiveSignatureVerifier;

impl SignatureVerifier for PermissiveSignatureVerifier {
    fn verify_signature(&self, bundle: &serde_json::Value) -> bool {
        let Some(envelope) = decode_envelope(bundle) else {
            return false;
        };
        envelope
            .signatures
            .first()
            .is_some_and(|s| !s.keyid.is_empty() && !s.sig.is_empty())
    }
}

/// Verifies DSSE-style ed25519 signatures against a fixed set of trusted
/// keys, keyed by `keyid`.
#[derive(Debug, Default, Clone)]
pub struct Ed25519SignatureVerifier {
    trusted_keys: BTreeMap<String, VerifyingKey>,
}

impl Ed25519SignatureVerifier {
    /// Create a verifier with no trusted keys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a trusted verifying key under `keyid`.
    #[must_use]
    pub fn with_key(mut self, keyid: impl Into<String>, key: VerifyingKey) -> Self {
        self.trusted_keys.insert(keyid.into(), key);
        self
    }
}

impl SignatureVerifier for Ed25519SignatureVerifier {
    fn verify_signature(&self, bundle: &serde_json::Value) -> bool {
        let Some(envelope) = decode_envelope(bundle) else {
            return false;
        };
        let Some(sig_entry) = envelope.signatures.first() else {
            return false;
        };
        let Some(key) = self.trusted_keys.get(&sig_entry.keyid) else {
            return false;
        };
        let Ok(payload) = base64::engine::general_purpose::STANDARD.decode(&envelope.payload) else {
            return false;
        };
        let Ok(sig_bytes) = base64::engine::general_purpose::STANDARD.decode(&sig_entry.sig) else {
            return false;
        };
        let Ok(sig_bytes): Result<[u8; 64], _> = sig_bytes.try_into() else {
            return false;
        };
        let signature = Signature::from_bytes(&sig_bytes);
        let pae = pae(PAYLOAD_TYPE_FOR_VERIFY, &payload);
        key.verify(&pae, &signature).is_ok()
    }
}

/// Bundles the three independent checks used to verify an [`Attestation`].
pub struct Verifiers<'a> {
    /// Certificate chain-of-trust check.
    pub certificate: &'a dyn CertificateVerifier,
    /// Signature validity check.
    pub signature: &'a dyn SignatureVerifier,
    /// Transparency-log inclusion check.
    pub rekor: &'a dyn RekorVerifier,
}

/// Run all three sub-checks against `attestation` and return an updated copy
/// with `verified`, the three sub-check fields, and `verified_at` populated.
///
/// `verified` is the conjunction of all three sub-checks: a deployment that
/// doesn't care about one of them (e.g. no transparency log) should pass a
/// verifier for it that always returns `true`, rather than skip the field.
#[must_use]
pub fn verify_attestation(attestation: &Attestation, verifiers: &Verifiers<'_>) -> Attestation {
    let certificate_verified = verifiers.certificate.verify_certificate(&attestation.bundle);
    let signature_verified = verifiers.signature.verify_signature(&attestation.bundle);
    let rekor_verified = verifiers.rekor.verify_inclusion(
        &attestation.bundle,
        attestation.rekor_log_id.as_deref(),
        attestation.rekor_log_index,
    );

    let mut updated = attestation.clone();
    updated.certificate_verified = certificate_verified;
    updated.signature_verified = signature_verified;
    updated.rekor_verified = rekor_verified;
    updated.verified = certificate_verified && signature_verified && rekor_verified;
    updated.verified_at = Some(Utc::now());
    updated
}
