// SPDX-License-Identifier: MIT OR Apache-2.0
//! `scripts` expansion: a manifest's named sub-commands are equivalent to
//! secondary manifests ("actions"), each executed with array-form
//! interpolation.

use crate::command::{CommandSpec, placeholder_param};
use schemars::JsonSchema;
use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A `scripts` entry: either a bare command (string or array form) or a
/// structured record carrying an explicit input schema.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ScriptSpec {
    /// Bare command, equivalent to `{command: ...}` with no explicit schema.
    Bare(CommandSpec),
    /// Structured form with an optional explicit input schema.
    Structured {
        /// The script's command.
        command: CommandSpec,
        /// Explicit input schema; if absent, inferred from `{{param}}` tokens.
        #[serde(default)]
        input_schema: Option<serde_json::Value>,
        /// One-line description.
        #[serde(default)]
        description: Option<String>,
    },
}

/// A named sub-command expanded from a manifest's `scripts`, ready to be
/// executed exactly like a top-level manifest command.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Action {
    /// The script's name, as declared under `scripts`.
    pub name: String,
    /// The action's command.
    pub command: CommandSpec,
    /// Effective input schema: explicit if declared, otherwise inferred.
    pub input_schema: serde_json::Value,
    /// One-line description, if declared.
    pub description: Option<String>,
}

/// Infers a JSON-Schema from the `{{param}}` tokens appearing in an
/// array-form command: every inferred parameter becomes a required string.
/// String-form commands (`${name}` syntax) are not inferred — their schema
/// must be declared explicitly or is left empty.
fn infer_schema(command: &CommandSpec) -> serde_json::Value {
    let CommandSpec::Array(tokens) = command else {
        return serde_json::json!({"type": "object", "properties": {}});
    };
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();
    for token in tokens {
        if let Some(param) = placeholder_param(token) {
            properties.insert(param.to_string(), serde_json::json!({"type": "string"}));
            required.push(serde_json::Value::String(param.to_string()));
        }
    }
    serde_json::json!({
        "type": "object",
        "properties": serde_json::Value::Object(properties),
        "required": required,
    })
}

/// Deserializes the `scripts` mapping's key order exactly as it appears in
/// the document, including repeated keys. A `BTreeMap<String, ScriptSpec>`
/// deserialized directly would silently keep only the last entry for a
/// repeated name; this is how callers detect the repeat before it's lost.
pub(crate) fn script_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct NamesVisitor;

    impl<'de> Visitor<'de> for NamesVisitor {
        type Value = Vec<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a mapping of script name to script spec")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut names = Vec::new();
            while let Some(key) = map.next_key::<String>()? {
                map.next_value::<IgnoredAny>()?;
                names.push(key);
            }
            Ok(names)
        }
    }

    deserializer.deserialize_map(NamesVisitor)
}

/// Expands a manifest's `scripts` map into a list of [`Action`]s, each with
/// an explicit-or-inferred input schema.
#[must_use]
pub fn expand_scripts(scripts: &BTreeMap<String, ScriptSpec>) -> Vec<Action> {
    scripts
        .iter()
        .map(|(name, spec)| match spec {
            ScriptSpec::Bare(command) => Action {
                name: name.clone(),
                input_schema: infer_schema(command),
                command: command.clone(),
                description: None,
            },
            ScriptSpec::Structured {
                command,
                input_schema,
                description,
            } => Action {
                name: name.clone(),
                input_schema: input_schema.clone().unwrap_or_else(|| infer_schema(command)),
                command: command.clone(),
                description: description.clone(),
            },
        })
        .collect()
}
