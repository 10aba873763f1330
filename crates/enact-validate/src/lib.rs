// SPDX-License-Identifier: MIT OR Apache-2.0
//! enact-validate
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! JSON-Schema validation shared by manifest input-schema checks (§4.A) and
//! skill output-schema checks (§4.I). Both call sites want the same shape:
//! a path-keyed list of human-readable reasons, never a single opaque
//! failure.

use enact_error::ErrorCode;
use serde_json::Value;

/// A single schema violation, keyed by its location in the instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// JSON Pointer to the offending location (e.g. `/inputs/count`).
    pub path: String,
    /// Human-readable reason.
    pub message: String,
}

/// Outcome of validating one instance against one schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// `true` iff `issues` is empty.
    pub valid: bool,
    /// Every violation found, in schema-traversal order.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn ok() -> Self {
        Self {
            valid: true,
            issues: Vec::new(),
        }
    }
}

/// Errors raised while compiling or applying a schema.
#[derive(Debug, thiserror::Error)]
pub enum ValidateError {
    /// The schema document itself is not a valid JSON-Schema.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
}

impl ValidateError {
    /// Maps this error onto the shared stable error-code taxonomy.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidSchema(_) => ErrorCode::SchemaViolation,
        }
    }
}

/// Validates `instance` against `schema`, collecting every violation rather
/// than stopping at the first one.
pub fn validate(schema: &Value, instance: &Value) -> Result<ValidationReport, ValidateError> {
    let compiled = jsonschema::validator_for(schema)
        .map_err(|e| ValidateError::InvalidSchema(e.to_string()))?;

    let issues: Vec<ValidationIssue> = compiled
        .iter_errors(instance)
        .map(|e| ValidationIssue {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if issues.is_empty() {
        Ok(ValidationReport::ok())
    } else {
        Ok(ValidationReport {
            valid: false,
            issues,
        })
    }
}

/// Attempts basic scalar coercions for obvious type mismatches (e.g. a
/// numeric string bound against an `integer`/`number` schema field), mirroring
/// the coercion step manifest input validation performs before interpolation.
/// Returns the coerced value unchanged if no coercion applies.
#[must_use]
pub fn coerce_scalar(expected_type: Option<&str>, value: Value) -> Value {
    match (expected_type, &value) {
        (Some("integer"), Value::String(s)) => s
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(value),
        (Some("number"), Value::String(s)) => {
            s.parse::<f64>().map(Value::from).unwrap_or(value)
        }
        (Some("boolean"), Value::String(s)) => match s.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => value,
        },
        (Some("string"), Value::Number(n)) => Value::String(n.to_string()),
        _ => value,
    }
}
