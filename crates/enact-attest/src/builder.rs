// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-toto statement construction and DSSE-style signing.

use base64::Engine;
use chrono::Utc;
use ed25519_dalek::{Signer, SigningKey};
use enact_core::{Attestation, AttestationRole};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const STATEMENT_TYPE: &str = "https://in-toto.io/Statement/v1";
const PREDICATE_TYPE: &str = "https://enact.dev/attestation/v1";
const PAYLOAD_TYPE: &str = "application/vnd.in-toto+json";

/// A subject of an in-toto statement: the thing being attested to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    /// Human-readable name, e.g. `"<tool>@<version>"`.
    pub name: String,
    /// Digest set, keyed by algorithm name (`"sha256"`).
    pub digest: BTreeMap<String, String>,
}

/// An in-toto v1 statement: a typed claim about a subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InTotoStatement {
    #[serde(rename = "_type")]
    pub statement_type: String,
    pub subject: Vec<Subject>,
    #[serde(rename = "predicateType")]
    pub predicate_type: String,
    pub predicate: serde_json::Value,
}

/// A single DSSE-style signature entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    /// Identifier of the key that produced `sig`, matched against a
    /// verifier's trusted key set.
    pub keyid: String,
    /// Base64-encoded raw signature bytes.
    pub sig: String,
}

/// A signed envelope wrapping an [`InTotoStatement`], following the shape of
/// a [DSSE](https://github.com/secure-systems-lab/dsse) envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Media type of the encoded payload.
    #[serde(rename = "payloadType")]
    pub payload_type: String,
    /// Base64-encoded, serialized [`InTotoStatement`].
    pub payload: String,
    /// Signatures over `payload`.
    pub signatures: Vec<Signature>,
}

pub(crate) fn pae(payload_type: &str, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 64);
    buf.extend_from_slice(b"DSSEv1");
    for field in [payload_type.as_bytes(), payload] {
        buf.extend_from_slice(format!(" {} ", field.len()).as_bytes());
        buf.extend_from_slice(field);
    }
    buf
}

/// Fluent builder for constructing and signing a skill [`Attestation`].
#[derive(Debug)]
pub struct AttestationBuilder {
    tool_version_id: String,
    auditor: String,
    auditor_provider: String,
    role: AttestationRole,
    subject_name: String,
    subject_sha256: String,
}

impl AttestationBuilder {
    /// Start building an attestation for `tool_version_id` (`"<tool>@<version>"`).
    #[must_use]
    pub fn new(tool_version_id: impl Into<String>) -> Self {
        Self {
            tool_version_id: tool_version_id.into(),
            auditor: String::new(),
            auditor_provider: String::new(),
            role: AttestationRole::Author,
            subject_name: String::new(),
            subject_sha256: String::new(),
        }
    }

    /// Set the signer's identity (`"github:alice"`) and provider (`"github"`).
    #[must_use]
    pub fn auditor(mut self, identity: impl Into<String>, provider: impl Into<String>) -> Self {
        self.auditor = identity.into();
        self.auditor_provider = provider.into();
        self
    }

    /// Set the role this attestation is signed under.
    #[must_use]
    pub fn role(mut self, role: AttestationRole) -> Self {
        self.role = role;
        self
    }

    /// Set the subject being attested to: a name and its bundle digest.
    #[must_use]
    pub fn subject(mut self, name: impl Into<String>, sha256_hex: impl Into<String>) -> Self {
        self.subject_name = name.into();
        self.subject_sha256 = sha256_hex.into();
        self
    }

    /// Build the unsigned [`InTotoStatement`] for this attestation.
    #[must_use]
    pub fn statement(&self) -> InTotoStatement {
        let mut digest = BTreeMap::new();
        digest.insert("sha256".to_string(), self.subject_sha256.clone());
        InTotoStatement {
            statement_type: STATEMENT_TYPE.to_string(),
            subject: vec![Subject {
                name: self.subject_name.clone(),
                digest,
            }],
            predicate_type: PREDICATE_TYPE.to_string(),
            predicate: serde_json::json!({
                "auditor": self.auditor,
                "auditorProvider": self.auditor_provider,
                "role": self.role,
            }),
        }
    }

    /// Sign the statement with `key` and produce the final [`Attestation`],
    /// unverified (the three verification booleans start `false`).
    ///
    /// # Errors
    ///
    /// Returns an error if the statement cannot be serialized.
    pub fn sign(self, key: &SigningKey, keyid: impl Into<String>) -> Result<Attestation, serde_json::Error> {
        let statement = self.statement();
        let payload = serde_json::to_vec(&statement)?;
        let payload_b64 = base64::engine::general_purpose::STANDARD.encode(&payload);

        let pae_bytes = pae(PAYLOAD_TYPE, &payload);
        let sig = key.sign(&pae_bytes);
        let sig_b64 = base64::engine::general_purpose::STANDARD.encode(sig.to_bytes());

        let envelope = Envelope {
            payload_type: PAYLOAD_TYPE.to_string(),
            payload: payload_b64,
            signatures: vec![Signature {
                keyid: keyid.into(),
                sig: sig_b64,
            }],
        };

        Ok(Attestation {
            tool_version_id: self.tool_version_id,
            auditor: self.auditor,
            auditor_provider: self.auditor_provider,
            role: self.role,
            bundle: serde_json::to_value(envelope)?,
            rekor_log_id: None,
            rekor_log_index: None,
            signed_at: Utc::now(),
            verified: false,
            rekor_verified: false,
            certificate_verified: false,
            signature_verified: false,
            verified_at: None,
            revoked: false,
        })
    }
}

pub(crate) fn decode_envelope(bundle: &serde_json::Value) -> Option<Envelope> {
    serde_json::from_value(bundle.clone()).ok()
}

pub(crate) const PAYLOAD_TYPE_FOR_VERIFY: &str = PAYLOAD_TYPE;
