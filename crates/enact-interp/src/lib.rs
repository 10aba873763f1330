// SPDX-License-Identifier: MIT OR Apache-2.0
//! enact-interp
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Two distinct, mutually exclusive interpolation modes for turning a
//! manifest command plus bound inputs into something runnable:
//!
//! - **String-form**: `${name}` substitution into a shell command text.
//!   Each substituted value is single-quote wrapped (`'` escaped as `'\''`)
//!   so the *implementation*, not the caller, owns quoting discipline.
//!   Retained for backward compatibility; its safety still depends on no
//!   other unescaped text sneaking into the template.
//! - **Array-form**: `{{param}}` tokens, each replacing exactly one argv
//!   element, never shell-interpreted. This is the injection-safe mode and
//!   the required one for new manifests.

use enact_error::ErrorCode;
use enact_manifest::placeholder_param;
use std::collections::BTreeMap;

/// A single input binding available to array-form interpolation.
#[derive(Debug, Clone, Default)]
pub struct Binding {
    /// The bound value, if the caller supplied or defaulted one.
    pub value: Option<String>,
    /// Whether execution must fail if no value is available.
    pub required: bool,
}

impl Binding {
    /// A required binding with a value.
    #[must_use]
    pub fn required(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            required: true,
        }
    }

    /// An optional binding with a value.
    #[must_use]
    pub fn optional(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            required: false,
        }
    }

    /// A required binding with no value bound yet.
    #[must_use]
    pub fn required_missing() -> Self {
        Self {
            value: None,
            required: true,
        }
    }

    /// An optional binding with no value bound yet.
    #[must_use]
    pub fn optional_missing() -> Self {
        Self {
            value: None,
            required: false,
        }
    }
}

/// Errors raised while interpolating a manifest command.
#[derive(Debug, thiserror::Error)]
pub enum InterpError {
    /// A required parameter has no bound value.
    #[error("missing required parameter: {0}")]
    MissingParam(String),
    /// An array-form token references a parameter with no binding at all.
    #[error("command references unbound parameter: {0}")]
    UnboundParam(String),
}

impl InterpError {
    /// Maps this error onto the shared stable error-code taxonomy.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MissingParam(_) => ErrorCode::MissingParam,
            Self::UnboundParam(_) => ErrorCode::CommandError,
        }
    }
}

/// Single-quote `value`, escaping any internal single quotes as `'\''`.
///
/// This is the only quoting strategy the string-form interpolator applies;
/// it is sufficient for a POSIX shell regardless of the value's content.
#[must_use]
pub fn shell_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(ch);
        }
    }
    out.push('\'');
    out
}

/// Renders a bound value for string-form substitution: strings pass through
/// verbatim, everything else is JSON-serialized first.
#[must_use]
fn shell_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Substitutes `${name}` occurrences in `template` with `values`, each
/// wrapped via [`shell_quote`]. A name with no entry in `values` is replaced
/// with an empty quoted string.
#[must_use]
pub fn interpolate_string(template: &str, values: &BTreeMap<String, serde_json::Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let bytes = template.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'{') {
            if let Some(end) = template[i + 2..].find('}') {
                let name = &template[i + 2..i + 2 + end];
                if is_identifier(name) {
                    let rendered = values
                        .get(name)
                        .map(shell_value)
                        .unwrap_or_default();
                    out.push_str(&shell_quote(&rendered));
                    i += 2 + end + 1;
                    continue;
                }
            }
        }
        let ch = template[i..].chars().next().expect("i is a char boundary");
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Builds the final argv for an array-form command: each `{{param}}` token
/// is replaced by exactly one argv element, literal tokens pass through
/// unchanged.
///
/// A required parameter with no bound value raises [`InterpError::MissingParam`].
/// An optional parameter with no bound value is omitted from the result
/// entirely, not replaced with an empty string. A token referencing a
/// parameter absent from `bindings` altogether raises [`InterpError::UnboundParam`].
pub fn interpolate_array(
    tokens: &[String],
    bindings: &BTreeMap<String, Binding>,
) -> Result<Vec<String>, InterpError> {
    let mut out = Vec::with_capacity(tokens.len());
    for token in tokens {
        match placeholder_param(token) {
            Some(name) => {
                let binding = bindings
                    .get(name)
                    .ok_or_else(|| InterpError::UnboundParam(name.to_string()))?;
                match &binding.value {
                    Some(v) => out.push(v.clone()),
                    None if binding.required => {
                        return Err(InterpError::MissingParam(name.to_string()));
                    }
                    None => {}
                }
            }
            None => out.push(token.clone()),
        }
    }
    Ok(out)
}
