// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading, validation, and merging for Enact.
//!
//! This crate provides [`EnactConfig`] — the on-disk `~/.enact/config.yaml`
//! settings (trust policy defaults, registry URL, an auth-token pointer) —
//! together with helpers for loading, merging overlays, and producing
//! advisory [`ConfigWarning`]s. The load/validate/merge split follows the
//! teacher's own config crate; only the wire format (YAML, per spec.md's
//! `config.yaml`) and the fields differ.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use enact_policy::TrustPolicy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be parsed as valid YAML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },

    /// No registry URL was configured, but one was required.
    #[error("no registry URL configured: set ENACT_REGISTRY_URL or registry_url in config.yaml")]
    MissingRegistryUrl,
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Advisory-level issues that do not prevent operation but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A deprecated field was used in the configuration.
    DeprecatedField {
        /// Name of the deprecated field.
        field: String,
        /// Suggested replacement, if any.
        suggestion: Option<String>,
    },
    /// A recommended optional field is missing.
    MissingOptionalField {
        /// Name of the missing field.
        field: String,
        /// Why it matters.
        hint: String,
    },
    /// The configured timeout is unusually large.
    LargeTimeout {
        /// Raw timeout string as configured.
        timeout: String,
    },
    /// A trust policy accepts artifacts with zero required attestations.
    WeakTrustPolicy {
        /// Why this is considered weak.
        hint: String,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::DeprecatedField { field, suggestion } => {
                write!(f, "deprecated field '{field}'")?;
                if let Some(s) = suggestion {
                    write!(f, " — use '{s}' instead")?;
                }
                Ok(())
            }
            ConfigWarning::MissingOptionalField { field, hint } => {
                write!(f, "missing optional field '{field}': {hint}")
            }
            ConfigWarning::LargeTimeout { timeout } => {
                write!(f, "configured timeout '{timeout}' is unusually large")
            }
            ConfigWarning::WeakTrustPolicy { hint } => {
                write!(f, "weak trust policy: {hint}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Top-level runtime configuration for Enact, loaded from
/// `~/.enact/config.yaml`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct EnactConfig {
    /// Registry base URL. Required before any registry-client operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_url: Option<String>,

    /// Name of the environment variable holding the registry auth token.
    /// A pointer to the secret, never the secret itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token_env: Option<String>,

    /// Default trust policy applied when resolving skills.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_policy: Option<TrustPolicy>,

    /// Default execution timeout (e.g. `"300s"`, `"5m"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Skip interactive prompts (first-run trust confirmations, etc.).
    #[serde(default)]
    pub skip_interactive: bool,

    /// Log level override (e.g. `"debug"`, `"info"`, `"warn"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Default for EnactConfig {
    fn default() -> Self {
        Self {
            registry_url: None,
            auth_token_env: None,
            trust_policy: None,
            timeout: None,
            skip_interactive: false,
            log_level: Some("info".into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Timeouts above this are flagged as a warning, not an error.
const LARGE_TIMEOUT_SECS: u64 = 3_600;

/// Recognised log levels.
const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// `ENACT_REGISTRY_URL` environment variable name.
pub const ENV_REGISTRY_URL: &str = "ENACT_REGISTRY_URL";
/// `ENACT_AUTH_TOKEN` environment variable name.
pub const ENV_AUTH_TOKEN: &str = "ENACT_AUTH_TOKEN";
/// `ENACT_REGISTRY_API_KEY` environment variable name (alias for the auth token).
pub const ENV_REGISTRY_API_KEY: &str = "ENACT_REGISTRY_API_KEY";
/// `ENACT_SKIP_INTERACTIVE` environment variable name.
pub const ENV_SKIP_INTERACTIVE: &str = "ENACT_SKIP_INTERACTIVE";

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load an [`EnactConfig`] from an optional YAML file path.
///
/// * If `path` is `Some`, reads and parses the file.
/// * If `path` is `None`, returns [`EnactConfig::default()`].
///
/// Environment variable overrides are applied on top in both cases.
pub fn load_config(path: Option<&Path>) -> Result<EnactConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.display().to_string(),
            })?;
            parse_yaml(&content)?
        }
        None => EnactConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parse a YAML string into an [`EnactConfig`].
pub fn parse_yaml(content: &str) -> Result<EnactConfig, ConfigError> {
    serde_yaml::from_str::<EnactConfig>(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Env overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides: `ENACT_REGISTRY_URL`,
/// `ENACT_AUTH_TOKEN` / `ENACT_REGISTRY_API_KEY`, `ENACT_SKIP_INTERACTIVE`.
pub fn apply_env_overrides(config: &mut EnactConfig) {
    if let Ok(val) = std::env::var(ENV_REGISTRY_URL) {
        config.registry_url = Some(val);
    }
    if std::env::var(ENV_AUTH_TOKEN).is_ok() {
        config.auth_token_env = Some(ENV_AUTH_TOKEN.to_string());
    } else if std::env::var(ENV_REGISTRY_API_KEY).is_ok() {
        config.auth_token_env = Some(ENV_REGISTRY_API_KEY.to_string());
    }
    if let Ok(val) = std::env::var(ENV_SKIP_INTERACTIVE) {
        config.skip_interactive = matches!(val.as_str(), "1" | "true" | "yes");
    }
}

impl EnactConfig {
    /// Returns the registry URL, or [`ConfigError::MissingRegistryUrl`] if
    /// none is configured. Registry-client operations must call this rather
    /// than reading `registry_url` directly: no default URL is compiled in.
    pub fn require_registry_url(&self) -> Result<&str, ConfigError> {
        self.registry_url
            .as_deref()
            .ok_or(ConfigError::MissingRegistryUrl)
    }

    /// Resolves the configured auth token by reading the environment
    /// variable named by `auth_token_env`. Returns `None` if no pointer is
    /// configured or the named variable is unset.
    #[must_use]
    pub fn resolve_auth_token(&self) -> Option<String> {
        self.auth_token_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a parsed configuration, returning advisory warnings.
///
/// Hard errors (invalid log level, unparsable timeout) are returned as a
/// [`ConfigError::ValidationError`]; soft issues (weak trust policy, large
/// timeout, missing optional fields) come back as warnings.
pub fn validate_config(config: &EnactConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<ConfigWarning> = Vec::new();

    if let Some(ref level) = config.log_level
        && !VALID_LOG_LEVELS.contains(&level.as_str())
    {
        errors.push(format!("invalid log_level '{level}'"));
    }

    if let Some(ref timeout) = config.timeout {
        match parse_timeout_secs(timeout) {
            Ok(secs) if secs > LARGE_TIMEOUT_SECS => {
                warnings.push(ConfigWarning::LargeTimeout {
                    timeout: timeout.clone(),
                });
            }
            Ok(_) => {}
            Err(reason) => errors.push(format!("invalid timeout '{timeout}': {reason}")),
        }
    }

    if let Some(ref policy) = config.trust_policy
        && policy.minimum_attestations == 0
        && !policy.allow_local_unsigned
    {
        warnings.push(ConfigWarning::WeakTrustPolicy {
            hint: "minimum_attestations is 0, so any fetched artifact is accepted unverified"
                .into(),
        });
    }

    if config.registry_url.is_none() {
        warnings.push(ConfigWarning::MissingOptionalField {
            field: "registry_url".into(),
            hint: "registry-client operations will fail until ENACT_REGISTRY_URL or this field is set".into(),
        });
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}

/// Parses a duration string like `"300s"`, `"5m"`, `"2h"`, `"500ms"` into
/// seconds. Mirrors the suffix grammar the execution engine accepts for its
/// own `timeout` field, so a config-level timeout and a manifest-level one
/// read the same way.
fn parse_timeout_secs(value: &str) -> Result<u64, String> {
    let value = value.trim();
    let (digits, suffix) = value
        .find(|c: char| !c.is_ascii_digit())
        .map(|i| value.split_at(i))
        .ok_or_else(|| "missing unit suffix (ms, s, m, h)".to_string())?;
    let n: u64 = digits.parse().map_err(|_| "not a number".to_string())?;
    match suffix {
        "ms" => Ok(n / 1000),
        "s" => Ok(n),
        "m" => Ok(n * 60),
        "h" => Ok(n * 3600),
        other => Err(format!("unrecognised unit '{other}'")),
    }
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

/// Merge two configurations. Values in `overlay` take precedence over `base`.
#[must_use]
pub fn merge_configs(base: EnactConfig, overlay: EnactConfig) -> EnactConfig {
    EnactConfig {
        registry_url: overlay.registry_url.or(base.registry_url),
        auth_token_env: overlay.auth_token_env.or(base.auth_token_env),
        trust_policy: overlay.trust_policy.or(base.trust_policy),
        timeout: overlay.timeout.or(base.timeout),
        skip_interactive: overlay.skip_interactive || base.skip_interactive,
        log_level: overlay.log_level.or(base.log_level),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
