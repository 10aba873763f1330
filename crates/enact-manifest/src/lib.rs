// SPDX-License-Identifier: MIT OR Apache-2.0
//! enact-manifest
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Parses, validates, and canonicalises skill manifests: frontmatter-plus-body
//! documents describing a container base image, optional build steps,
//! input/output schemas, environment bindings, and an execution command.

mod command;
mod scripts;

pub use command::{CommandSpec, mixed_template_positions, placeholder_param};
pub use scripts::{Action, expand_scripts};

use enact_core::canonical_json;
use enact_error::ErrorCode;
use schemars::JsonSchema;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// A single environment variable binding declared in a manifest.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct EnvVarSpec {
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// `true` if the value must never be interpolated into commands or logs.
    #[serde(default)]
    pub secret: bool,
    /// Default value used when the caller does not supply one.
    #[serde(default)]
    pub default: Option<String>,
    /// `true` if execution must fail fast when no value is available.
    #[serde(default)]
    pub required: bool,
}

/// The parsed, validated form of a skill manifest.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Manifest {
    /// Hierarchical identifier: lowercase alphanumerics and hyphens,
    /// `/`-separated segments, optionally prefixed with `@org/`.
    pub name: String,
    /// Semantic version triple, immutable once published.
    pub version: String,
    /// One-line summary.
    #[serde(default)]
    pub description: Option<String>,
    /// Base container image reference. Defaults to `alpine:latest` if absent.
    #[serde(default)]
    pub from: Option<String>,
    /// Ordered sequence of setup commands, run once, cached.
    #[serde(default)]
    pub build: Vec<String>,
    /// String-form or array-form execution command.
    #[serde(default)]
    pub command: Option<CommandSpec>,
    /// JSON-Schema describing parameters.
    #[serde(default)]
    pub input_schema: Option<serde_json::Value>,
    /// JSON-Schema describing the output shape.
    #[serde(default)]
    pub output_schema: Option<serde_json::Value>,
    /// Environment variable bindings.
    #[serde(default)]
    pub env: BTreeMap<String, EnvVarSpec>,
    /// Duration string like `30s`, `5m`, `1h`.
    #[serde(default)]
    pub timeout: Option<String>,
    /// Named sub-commands; each is equivalent to a secondary manifest.
    #[serde(default)]
    pub scripts: BTreeMap<String, scripts::ScriptSpec>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// SPDX license identifier.
    #[serde(default)]
    pub license: Option<String>,
    /// Arbitrary publisher-supplied metadata.
    #[serde(default)]
    pub annotations: BTreeMap<String, serde_json::Value>,
}

/// Errors raised while parsing, validating, or canonicalising a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// Frontmatter or body failed to parse as YAML.
    #[error("failed to parse manifest YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// `name` does not match the identifier grammar.
    #[error("invalid name {0:?}: must be lowercase alphanumeric/hyphen segments, optionally prefixed with @org/")]
    InvalidName(String),
    /// `version` does not parse as a semver triple.
    #[error("invalid version {0:?}: {1}")]
    InvalidVersion(String, semver::Error),
    /// Manifest fails schema validation.
    #[error("schema violation: {0}")]
    SchemaViolation(String),
    /// A `{{param}}` token is concatenated with literal text in an array command.
    #[error("mixed template in command element {0:?}: placeholders must occupy a whole argv element")]
    MixedTemplate(String),
    /// Two `scripts` entries share a name.
    #[error("duplicate script name: {0}")]
    DuplicateScript(String),
    /// Canonical-form serialization failed.
    #[error("canonicalisation failed: {0}")]
    Canonicalise(#[from] enact_core::ContractError),
}

impl ManifestError {
    /// Maps this error onto the shared stable error-code taxonomy.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Yaml(_) => ErrorCode::SchemaViolation,
            Self::InvalidName(_) => ErrorCode::InvalidName,
            Self::InvalidVersion(..) => ErrorCode::InvalidVersion,
            Self::SchemaViolation(_) => ErrorCode::SchemaViolation,
            Self::MixedTemplate(_) => ErrorCode::MixedTemplate,
            Self::DuplicateScript(_) => ErrorCode::DuplicateScript,
            Self::Canonicalise(_) => ErrorCode::Internal,
        }
    }
}

static NAME_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^(@[a-z0-9]+(-[a-z0-9]+)*/)?[a-z0-9]+(-[a-z0-9]+)*(/[a-z0-9]+(-[a-z0-9]+)*)*$")
        .expect("static name regex is valid")
});

/// Splits a manifest file into an optional frontmatter block and a body.
///
/// A frontmatter block is delimited by `---` lines; when absent, the whole
/// file is treated as the structured document and the body is empty.
#[must_use]
pub fn split_frontmatter(text: &str) -> (&str, &str) {
    let trimmed = text.trim_start();
    if let Some(rest) = trimmed.strip_prefix("---") {
        let rest = rest.strip_prefix('\n').unwrap_or(rest);
        if let Some(end) = rest.find("\n---") {
            let frontmatter = &rest[..end];
            let after = &rest[end + 4..];
            let body = after.strip_prefix('\n').unwrap_or(after);
            return (frontmatter, body);
        }
    }
    (text, "")
}

/// Parses a manifest file's raw bytes into a validated [`Manifest`].
///
/// Returns the parsed manifest together with the exact original bytes,
/// which is what signing/attestation operates over when the subject is the
/// manifest hash rather than the bundle hash.
pub fn parse(raw: &[u8]) -> Result<(Manifest, Vec<u8>), ManifestError> {
    let text = String::from_utf8_lossy(raw);
    let (frontmatter, _body) = split_frontmatter(&text);
    reject_duplicate_scripts(frontmatter)?;
    let manifest: Manifest = serde_yaml::from_str(frontmatter)?;
    validate(&manifest)?;
    Ok((manifest, raw.to_vec()))
}

/// Scans the raw `scripts` mapping for a repeated name before it's lost to
/// `BTreeMap`'s last-write-wins deserialization.
fn reject_duplicate_scripts(frontmatter: &str) -> Result<(), ManifestError> {
    #[derive(Deserialize)]
    struct ScriptNamesOnly {
        #[serde(default, deserialize_with = "scripts::script_names")]
        scripts: Vec<String>,
    }
    let doc: ScriptNamesOnly = serde_yaml::from_str(frontmatter)?;
    let mut seen = std::collections::HashSet::new();
    for name in doc.scripts {
        if !seen.insert(name.clone()) {
            return Err(ManifestError::DuplicateScript(name));
        }
    }
    Ok(())
}

/// Validates a manifest's structural invariants beyond what serde enforces.
pub fn validate(manifest: &Manifest) -> Result<(), ManifestError> {
    if !NAME_RE.is_match(&manifest.name) {
        return Err(ManifestError::InvalidName(manifest.name.clone()));
    }
    Version::parse(&manifest.version)
        .map_err(|e| ManifestError::InvalidVersion(manifest.version.clone(), e))?;

    if let Some(CommandSpec::Array(tokens)) = &manifest.command {
        if let Some(bad) = mixed_template_positions(tokens).into_iter().next() {
            return Err(ManifestError::MixedTemplate(tokens[bad].clone()));
        }
    }

    Ok(())
}

/// Produces the canonical byte form of a manifest for hashing/signing.
///
/// `signatures`, if present as an annotation key, is stripped before
/// canonicalisation per the signing-input contract.
pub fn canonicalise(manifest: &Manifest) -> Result<String, ManifestError> {
    let mut value = serde_json::to_value(manifest)?;
    if let serde_json::Value::Object(map) = &mut value {
        map.remove("signatures");
    }
    Ok(canonical_json(&value)?)
}
