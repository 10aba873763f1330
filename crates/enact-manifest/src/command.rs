// SPDX-License-Identifier: MIT OR Apache-2.0
//! Manifest command forms: the string/array split described in the
//! interpolation design, plus the mixed-template validator that belongs to
//! parsing rather than execution.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A manifest's execution command, either opaque shell text or an ordered
/// argv template.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(untagged)]
pub enum CommandSpec {
    /// A single string, interpolated with `${name}` and run through a shell.
    /// Retained for backward compatibility; see the array form for the
    /// injection-safe path.
    String(String),
    /// An ordered sequence of argv tokens, each optionally containing a
    /// single whole `{{param}}` placeholder.
    Array(Vec<String>),
}

/// A `{{param}}` placeholder token: `{{` + identifier + `}}`, nothing else.
fn is_whole_placeholder(token: &str) -> bool {
    token.starts_with("{{") && token.ends_with("}}") && token.len() > 4
}

/// Returns the indices of elements in an array-form command where a
/// `{{param}}` placeholder is concatenated with surrounding literal text
/// (e.g. `"prefix-{{msg}}"` or `"{{msg}}-suffix"`), which is rejected: each
/// template must become exactly one argv argument on its own.
#[must_use]
pub fn mixed_template_positions(tokens: &[String]) -> Vec<usize> {
    tokens
        .iter()
        .enumerate()
        .filter_map(|(i, t)| {
            let has_open = t.contains("{{");
            let has_close = t.contains("}}");
            if (has_open || has_close) && !is_whole_placeholder(t) {
                Some(i)
            } else {
                None
            }
        })
        .collect()
}

/// Extracts the parameter name from a whole-element placeholder
/// (`"{{msg}}"` → `Some("msg")`), or `None` if `token` is not a placeholder.
#[must_use]
pub fn placeholder_param(token: &str) -> Option<&str> {
    if is_whole_placeholder(token) {
        Some(&token[2..token.len() - 2])
    } else {
        None
    }
}
