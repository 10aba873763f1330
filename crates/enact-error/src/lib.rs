//! Unified error taxonomy with stable error codes for Enact.
//!
//! Every Enact error carries an [`ErrorCode`] (a machine-readable, stable
//! string tag), a human-readable message, an optional cause chain, and
//! arbitrary key-value context. Use the builder returned by
//! [`EnactError::new`] to construct errors fluently. This is the taxonomy
//! every crate in the workspace maps its own internal errors onto at its
//! public boundary, so the registry service and the execution engine can
//! both emit the `{error:{code, message, details?}}` wire shape from a
//! single source of truth.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family that an [`ErrorCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Manifest parsing, validation, and canonicalisation errors.
    Manifest,
    /// Signing and attestation verification errors.
    Attestation,
    /// Trust policy evaluation errors.
    Policy,
    /// Registry storage and service errors.
    Registry,
    /// Local resolver and cache errors.
    Resolver,
    /// Container execution engine errors.
    Execution,
    /// Input interpolation errors.
    Interpolation,
    /// Configuration errors.
    Config,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Manifest => "manifest",
            Self::Attestation => "attestation",
            Self::Policy => "policy",
            Self::Registry => "registry",
            Self::Resolver => "resolver",
            Self::Execution => "execution",
            Self::Interpolation => "interpolation",
            Self::Config => "config",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
///
/// Each variant serialises to a `SCREAMING_SNAKE_CASE` string that is
/// guaranteed not to change across patch releases. This is the exact set
/// named in the error handling design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // -- Manifest (§4.A) --
    /// `name` does not match the identifier grammar.
    InvalidName,
    /// `version` does not parse as a semver triple.
    InvalidVersion,
    /// Manifest fails schema validation.
    SchemaViolation,
    /// A `{{param}}` token is concatenated with a literal in an array command.
    MixedTemplate,
    /// Two `scripts` entries share a name.
    DuplicateScript,

    // -- Attestation (§4.C) --
    /// OIDC identity provider authentication failed.
    OidcFailed,
    /// The ephemeral signing certificate issuer rejected the request.
    CertIssueFailed,
    /// The transparency log did not include, or could not confirm, the entry.
    LogInclusionFailed,
    /// The signature over the statement did not verify.
    SigInvalid,
    /// Certificate identity claim does not match the expected signer.
    IdentityMismatch,

    // -- Policy (§4.D) --
    /// Trust policy rejected the artifact's attestation set.
    PolicyFail,

    // -- Registry (§4.F) --
    /// Requested entity does not exist.
    NotFound,
    /// Conflicting state (e.g. duplicate version).
    Conflict,
    /// Missing or invalid bearer token.
    Unauthorized,
    /// Publisher does not own the target namespace.
    NamespaceMismatch,
    /// Request body or parameters failed validation.
    ValidationError,
    /// The requested version is yanked and was not acknowledged.
    VersionYanked,
    /// Malformed request.
    BadRequest,

    // -- Execution (§4.I) --
    /// A build step exited non-zero.
    BuildError,
    /// Requested container runtime is not available.
    RuntimeNotFound,
    /// The container runtime itself failed (distinct from the skill's own
    /// non-zero exit, which is reported in the result, not as an error).
    ContainerError,
    /// Execution exceeded its wall-clock deadline.
    Timeout,
    /// Execution was cancelled by the caller.
    Cancelled,
    /// Unclassified execution-engine failure.
    EngineError,

    // -- Interpolation (§4.J) --
    /// A required parameter has no bound value.
    MissingParam,
    /// Unclassified command-construction failure.
    CommandError,

    // -- Cross-cutting --
    /// Transient network failure (registry client, signing/log services).
    NetworkError,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl ErrorCode {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidName
            | Self::InvalidVersion
            | Self::SchemaViolation
            | Self::MixedTemplate
            | Self::DuplicateScript => ErrorCategory::Manifest,

            Self::OidcFailed
            | Self::CertIssueFailed
            | Self::LogInclusionFailed
            | Self::SigInvalid
            | Self::IdentityMismatch => ErrorCategory::Attestation,

            Self::PolicyFail => ErrorCategory::Policy,

            Self::NotFound
            | Self::Conflict
            | Self::Unauthorized
            | Self::NamespaceMismatch
            | Self::ValidationError
            | Self::VersionYanked
            | Self::BadRequest => ErrorCategory::Registry,

            Self::BuildError
            | Self::RuntimeNotFound
            | Self::ContainerError
            | Self::Timeout
            | Self::Cancelled
            | Self::EngineError => ErrorCategory::Execution,

            Self::MissingParam | Self::CommandError => ErrorCategory::Interpolation,

            Self::NetworkError => ErrorCategory::Resolver,

            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// Stable `&'static str` representation of the code (e.g.
    /// `"SCHEMA_VIOLATION"`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidName => "INVALID_NAME",
            Self::InvalidVersion => "INVALID_VERSION",
            Self::SchemaViolation => "SCHEMA_VIOLATION",
            Self::MixedTemplate => "MIXED_TEMPLATE",
            Self::DuplicateScript => "DUPLICATE_SCRIPT",
            Self::OidcFailed => "OIDC_FAILED",
            Self::CertIssueFailed => "CERT_ISSUE_FAILED",
            Self::LogInclusionFailed => "LOG_INCLUSION_FAILED",
            Self::SigInvalid => "SIG_INVALID",
            Self::IdentityMismatch => "IDENTITY_MISMATCH",
            Self::PolicyFail => "POLICY_FAIL",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NamespaceMismatch => "NAMESPACE_MISMATCH",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::VersionYanked => "VERSION_YANKED",
            Self::BadRequest => "BAD_REQUEST",
            Self::BuildError => "BUILD_ERROR",
            Self::RuntimeNotFound => "RUNTIME_NOT_FOUND",
            Self::ContainerError => "CONTAINER_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Cancelled => "CANCELLED",
            Self::EngineError => "ENGINE_ERROR",
            Self::MissingParam => "MISSING_PARAM",
            Self::CommandError => "COMMAND_ERROR",
            Self::NetworkError => "NETWORK_ERROR",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EnactError
// ---------------------------------------------------------------------------

/// Unified Enact error.
///
/// Carries a stable [`ErrorCode`], a human-readable message, an optional
/// source error for cause-chaining, and arbitrary structured context (e.g.
/// a yank's `reason`/`replacement`, or a build failure's step index).
///
/// # Builder usage
///
/// ```
/// use enact_error::{EnactError, ErrorCode};
///
/// let err = EnactError::new(ErrorCode::Timeout, "execution exceeded deadline")
///     .with_context("timeout_ms", 30_000)
///     .with_context("tool", "@test/hello");
/// ```
pub struct EnactError {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Arbitrary structured context for diagnostics, serialised as the
    /// wire body's `details` field.
    pub context: BTreeMap<String, serde_json::Value>,
}

impl EnactError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    /// Attach a key-value pair to the diagnostic context.
    ///
    /// The value is converted via [`serde_json::to_value`]; if serialisation
    /// fails, the entry is silently skipped.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Attach an underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Shorthand for `self.code.category()`.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }
}

impl fmt::Debug for EnactError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("EnactError");
        d.field("code", &self.code);
        d.field("message", &self.message);
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        if !self.context.is_empty() {
            d.field("context", &self.context);
        }
        d.finish()
    }
}

impl fmt::Display for EnactError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)?;
        if !self.context.is_empty() {
            // Deterministic output thanks to BTreeMap.
            if let Ok(ctx) = serde_json::to_string(&self.context) {
                write!(f, " {ctx}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for EnactError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

// ---------------------------------------------------------------------------
// Wire body
// ---------------------------------------------------------------------------

/// Serialisable snapshot of an [`EnactError`], matching the `{error:{code,
/// message, details?}}` wire shape used by the registry service and the
/// execution engine result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Structured context, omitted entirely when empty.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub details: BTreeMap<String, serde_json::Value>,
}

impl From<&EnactError> for ErrorBody {
    fn from(err: &EnactError) -> Self {
        Self {
            code: err.code,
            message: err.message.clone(),
            details: err.context.clone(),
        }
    }
}

impl From<EnactError> for ErrorBody {
    fn from(err: EnactError) -> Self {
        (&err).into()
    }
}
