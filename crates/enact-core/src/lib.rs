// SPDX-License-Identifier: MIT OR Apache-2.0
//! enact-core
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Shared contract types for Enact: the manifest, bundle, version record,
//! attestation, profile/organization/membership, and local cache entry
//! shapes described in the data model, plus the canonical-hashing helpers
//! every other crate in the workspace builds on.
//!
//! If you only take one dependency from this workspace, take this one.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Wire/contract version embedded in manifests and envelopes.
pub const CONTRACT_VERSION: &str = "enact/v1";

/// Ordered prefix of canonicalisation keys, fixed for cross-implementation
/// signature compatibility. Any key not in this list sorts after it,
/// lexicographically.
///
/// Extending this list is a breaking change to the signing input and MUST
/// be done in a versioned way so existing signatures remain verifiable.
pub const CANONICAL_KEY_PREFIX: &[&str] = &[
    "name",
    "description",
    "command",
    "protocol_version",
    "version",
    "timeout",
    "tags",
    "input_schema",
    "output_schema",
    "annotations",
    "env_vars",
    "examples",
    "resources",
    "doc",
    "authors",
    "enact",
];

/// Content-addressed, deterministically-archived skill directory.
///
/// See the bundle packer for how `hash` and `size` are computed; this type
/// is the *record* of a bundle, not the archive bytes themselves.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Bundle {
    /// `sha256:<hex>` over the uncompressed archive bytes.
    pub hash: String,
    /// Size in bytes of the uncompressed archive.
    pub size: u64,
}

/// A tool's persisted version row.
///
/// `manifest` holds the parsed, canonicalised form; `raw_manifest` holds the
/// original bytes exactly as uploaded, which is what signing/attestation
/// operates over when the subject is the manifest hash rather than the
/// bundle hash.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VersionRecord {
    /// Owning tool identifier (stable UUID-hex, not the display name).
    pub tool_id: String,
    /// Semantic version string, immutable once published.
    pub version: String,
    /// The raw manifest bytes, exactly as published.
    pub raw_manifest: Vec<u8>,
    /// `sha256:<hex>` of the uncompressed bundle archive.
    pub bundle_hash: String,
    /// Size in bytes of the uncompressed bundle archive.
    pub bundle_size: u64,
    /// Content-addressed path under the blob store root.
    pub bundle_path: String,
    /// Monotonically increasing per-version download counter.
    pub downloads: u64,
    /// `true` once this version has been yanked (reversible soft-delete).
    pub yanked: bool,
    /// Reason supplied at yank time; cleared on unyank.
    pub yank_reason: Option<String>,
    /// Suggested replacement version; cleared on unyank.
    pub replacement: Option<String>,
    /// Publisher's profile identifier.
    pub published_by: String,
    /// Publish timestamp.
    pub published_at: DateTime<Utc>,
}

impl VersionRecord {
    /// Mark this version as yanked. Idempotent.
    pub fn yank(&mut self, reason: impl Into<String>, replacement: Option<String>) {
        self.yanked = true;
        self.yank_reason = Some(reason.into());
        self.replacement = replacement;
    }

    /// Reverse a yank. Idempotent; clears reason and replacement.
    pub fn unyank(&mut self) {
        self.yanked = false;
        self.yank_reason = None;
        self.replacement = None;
    }
}

/// Role a signer attaches to an attestation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttestationRole {
    /// The original author of the skill.
    Author,
    /// A reviewer who inspected the skill prior to publish.
    Reviewer,
    /// A final approver sign-off.
    Approver,
}

/// A signed in-toto statement binding an auditor identity to a skill
/// version. Multiple attestations per version are allowed and additive —
/// they never supersede or revoke one another except via `revoked`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Attestation {
    /// Owning version's identifier, `"<tool_id>@<version>"`.
    pub tool_version_id: String,
    /// Identity string, e.g. `"github:alice"`.
    pub auditor: String,
    /// Identity provider, e.g. `"github"`.
    pub auditor_provider: String,
    /// Role this attestation was signed under.
    pub role: AttestationRole,
    /// Opaque signing-service envelope (certificate chain + signature +
    /// transparency-log inclusion proof), stored as received.
    pub bundle: serde_json::Value,
    /// Transparency-log entry identifier.
    pub rekor_log_id: Option<String>,
    /// Transparency-log entry index.
    pub rekor_log_index: Option<u64>,
    /// Timestamp the envelope claims to have been signed at.
    pub signed_at: DateTime<Utc>,
    /// Conjunction of the three sub-checks below.
    pub verified: bool,
    /// Transparency-log inclusion check result.
    pub rekor_verified: bool,
    /// Certificate chain-of-trust check result.
    pub certificate_verified: bool,
    /// Signature validity check result.
    pub signature_verified: bool,
    /// When verification was last (re-)run.
    pub verified_at: Option<DateTime<Utc>>,
    /// `true` once an administrator has revoked this attestation.
    pub revoked: bool,
}

/// Membership role within an organization namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MembershipRole {
    /// Full control, including deleting the organization.
    Owner,
    /// Can manage membership and namespace tools.
    Admin,
    /// Can publish under the namespace.
    Member,
}

/// A publisher identity. Unique by `username`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Profile {
    /// Stable identifier (UUID-hex).
    pub id: Uuid,
    /// Globally unique handle. Tools may be published under a namespace
    /// equal to this value.
    pub username: String,
}

/// An organization, owning a `@namespace`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Organization {
    /// Stable identifier (UUID-hex).
    pub id: Uuid,
    /// Namespace, always beginning with `@`.
    pub namespace: String,
}

/// A profile's membership in an organization.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Membership {
    /// Member profile id.
    pub profile_id: Uuid,
    /// Organization id.
    pub org_id: Uuid,
    /// Role within the organization.
    pub role: MembershipRole,
}

/// Visibility tier of a published tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Included in search and browse results.
    #[default]
    Public,
    /// Fetchable by exact name, excluded from search scans.
    Unlisted,
    /// Only fetchable by the owning profile/org members.
    Private,
}

/// A resolver's record of a locally cached download.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LocalCacheEntry {
    /// Tool name as resolved.
    pub name: String,
    /// Cached version string.
    pub version: String,
    /// When this entry was written.
    pub cached_at: DateTime<Utc>,
    /// Time-to-live, in seconds, from `cached_at`.
    pub ttl_secs: u64,
    /// Path to the cached (parsed-on-demand) manifest file.
    pub manifest_path: String,
    /// Path to the cached bundle archive.
    pub bundle_path: String,
}

impl LocalCacheEntry {
    /// `true` if `now` is past `cached_at + ttl_secs`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let expires_at = self.cached_at + chrono::Duration::seconds(self.ttl_secs as i64);
        now >= expires_at
    }
}

/// Errors from contract-level operations (serialization, hashing).
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    /// JSON serialization or deserialization failed.
    #[error("failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Produce a deterministic JSON string for hashing, honoring
/// [`CANONICAL_KEY_PREFIX`] at the top level and sorting all remaining keys
/// (at every level) lexicographically.
///
/// `serde_json::Map` is a `BTreeMap` by default, so nested objects already
/// sort lexicographically; this function only needs to reorder the
/// top-level fixed prefix before falling back to that default ordering.
///
/// # Errors
///
/// Returns [`ContractError::Json`] if `value` cannot be serialized.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, ContractError> {
    let v = serde_json::to_value(value)?;
    let ordered = reorder_top_level(v);
    Ok(serde_json::to_string(&ordered)?)
}

/// Re-emit a JSON object with [`CANONICAL_KEY_PREFIX`] keys first (in that
/// order, skipping absent ones), followed by any remaining keys in the
/// lexicographic order `serde_json::Map`'s `BTreeMap` backing already gives
/// them. Non-object values pass through unchanged.
fn reorder_top_level(value: serde_json::Value) -> serde_json::Value {
    let serde_json::Value::Object(map) = value else {
        return value;
    };
    let mut ordered = serde_json::Map::new();
    for key in CANONICAL_KEY_PREFIX {
        if let Some(v) = map.get(*key) {
            ordered.insert((*key).to_string(), v.clone());
        }
    }
    for (k, v) in map {
        if !ordered.contains_key(&k) {
            ordered.insert(k, v);
        }
    }
    serde_json::Value::Object(ordered)
}

/// Compute the hex-encoded SHA-256 digest of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Compute `sha256:<hex>` over `bytes`, the form used for bundle hashes,
/// signing subjects, and download `ETag`s.
#[must_use]
pub fn sha256_prefixed(bytes: &[u8]) -> String {
    format!("sha256:{}", sha256_hex(bytes))
}
