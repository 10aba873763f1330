// SPDX-License-Identifier: MIT OR Apache-2.0
//! Mount phase: turns caller-supplied input paths and manifest environment
//! bindings into the [`Mount`] list and environment map a [`ContainerSpec`]
//! carries into the container.

use enact_exec_core::Mount;
use enact_manifest::EnvVarSpec;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Whether a caller-supplied input path is a single file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputLabel {
    /// A single file.
    File,
    /// A directory tree.
    Directory,
}

/// One caller-supplied input path to mount into the container.
#[derive(Debug, Clone)]
pub struct CallerInput {
    /// `None` for the single unnamed input (mounted at `/input`); `Some(name)`
    /// for a named input (mounted at `/inputs/<name>`).
    pub name: Option<String>,
    /// Path on the host.
    pub host_path: PathBuf,
    /// Whether it is a file or a directory.
    pub label: InputLabel,
}

/// Builds the bind-mount list for a set of caller inputs.
#[must_use]
pub fn build_mounts(inputs: &[CallerInput]) -> Vec<Mount> {
    inputs
        .iter()
        .map(|input| {
            let container_path = match &input.name {
                Some(name) => format!("/inputs/{name}"),
                None => "/input".to_string(),
            };
            Mount {
                host_path: input.host_path.clone(),
                container_path,
                read_only: true,
            }
        })
        .collect()
}

/// Raised while resolving a manifest's declared environment against caller
/// values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MountError {
    /// A `required: true` variable has neither a caller value nor a default.
    #[error("missing required environment variable: {0}")]
    MissingRequiredEnv(String),
}

/// The opaque reference a secret environment variable resolves to. The real
/// value is looked up by the runtime through this reference; it is never
/// interpolated into commands or written to logs.
#[must_use]
pub fn secret_reference(name: &str) -> String {
    format!("secret:{name}")
}

/// Resolves a manifest's declared environment variables against caller
/// values, applying defaults, opaque-izing secrets, and merging the
/// caller's additional overrides last (so an override can also introduce
/// environment variables the manifest never declared).
pub fn resolve_env(
    declared: &BTreeMap<String, EnvVarSpec>,
    caller_values: &BTreeMap<String, String>,
    caller_overrides: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, MountError> {
    let mut resolved = BTreeMap::new();

    for (name, spec) in declared {
        let value = caller_values.get(name).cloned().or_else(|| spec.default.clone());
        match value {
            Some(v) => {
                let final_value = if spec.secret { secret_reference(name) } else { v };
                resolved.insert(name.clone(), final_value);
            }
            None if spec.required => {
                return Err(MountError::MissingRequiredEnv(name.clone()));
            }
            None => {}
        }
    }

    for (name, value) in caller_overrides {
        resolved.insert(name.clone(), value.clone());
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_spec(default: Option<&str>, secret: bool, required: bool) -> EnvVarSpec {
        EnvVarSpec {
            description: None,
            secret,
            default: default.map(String::from),
            required,
        }
    }

    #[test]
    fn unnamed_input_mounts_at_slash_input() {
        let inputs = vec![CallerInput {
            name: None,
            host_path: PathBuf::from("/tmp/data.csv"),
            label: InputLabel::File,
        }];
        let mounts = build_mounts(&inputs);
        assert_eq!(mounts[0].container_path, "/input");
    }

    #[test]
    fn named_input_mounts_under_slash_inputs() {
        let inputs = vec![CallerInput {
            name: Some("dataset".to_string()),
            host_path: PathBuf::from("/tmp/dataset"),
            label: InputLabel::Directory,
        }];
        let mounts = build_mounts(&inputs);
        assert_eq!(mounts[0].container_path, "/inputs/dataset");
    }

    #[test]
    fn declared_default_passes_through_unset_variable() {
        let mut declared = BTreeMap::new();
        declared.insert("LEVEL".to_string(), env_spec(Some("info"), false, false));
        let resolved = resolve_env(&declared, &BTreeMap::new(), &BTreeMap::new()).unwrap();
        assert_eq!(resolved.get("LEVEL"), Some(&"info".to_string()));
    }

    #[test]
    fn secret_variable_is_never_the_literal_value() {
        let mut declared = BTreeMap::new();
        declared.insert("API_KEY".to_string(), env_spec(None, true, true));
        let mut values = BTreeMap::new();
        values.insert("API_KEY".to_string(), "sk-super-secret".to_string());
        let resolved = resolve_env(&declared, &values, &BTreeMap::new()).unwrap();
        assert_eq!(resolved.get("API_KEY"), Some(&"secret:API_KEY".to_string()));
    }

    #[test]
    fn missing_required_variable_without_default_is_an_error() {
        let mut declared = BTreeMap::new();
        declared.insert("TOKEN".to_string(), env_spec(None, false, true));
        let err = resolve_env(&declared, &BTreeMap::new(), &BTreeMap::new()).unwrap_err();
        assert_eq!(err, MountError::MissingRequiredEnv("TOKEN".to_string()));
    }

    #[test]
    fn missing_optional_variable_without_default_is_simply_absent() {
        let mut declared = BTreeMap::new();
        declared.insert("OPTIONAL".to_string(), env_spec(None, false, false));
        let resolved = resolve_env(&declared, &BTreeMap::new(), &BTreeMap::new()).unwrap();
        assert!(!resolved.contains_key("OPTIONAL"));
    }

    #[test]
    fn caller_overrides_are_merged_last_and_win() {
        let mut declared = BTreeMap::new();
        declared.insert("LEVEL".to_string(), env_spec(Some("info"), false, false));
        let mut overrides = BTreeMap::new();
        overrides.insert("LEVEL".to_string(), "debug".to_string());
        overrides.insert("EXTRA".to_string(), "1".to_string());
        let resolved = resolve_env(&declared, &BTreeMap::new(), &overrides).unwrap();
        assert_eq!(resolved.get("LEVEL"), Some(&"debug".to_string()));
        assert_eq!(resolved.get("EXTRA"), Some(&"1".to_string()));
    }
}
