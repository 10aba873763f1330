// SPDX-License-Identifier: MIT OR Apache-2.0
//! enact-attest
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! In-toto statement construction, DSSE-style ed25519 signing, and pluggable
//! verification for skill attestations. Verification is split into three
//! independent sub-checks — certificate chain, signature, transparency-log
//! inclusion — whose conjunction is [`Attestation::verified`]; each check is
//! a trait so a deployment can swap in a real Fulcio root of trust or Rekor
//! client without touching the other two.

mod aggregate;
mod builder;
mod verify;

pub use aggregate::{AttestationSet, TrustSummary};
pub use builder::{AttestationBuilder, Envelope, InTotoStatement, Signature, Subject};
pub use verify::{
    CertificateVerifier, Ed25519SignatureVerifier, PermissiveCertificateVerifier,
    PermissiveSignatureVerifier, PresenceRekorVerifier, RekorVerifier, SignatureVerifier,
    Verifiers, verify_attestation,
};

pub use enact_core::{Attestation, AttestationRole};
