// SPDX-License-Identifier: MIT OR Apache-2.0
//! Output phase: captures stdout/stderr/exit code, optionally exports
//! `/output` and named files to the host, and attaches a parsed+validated
//! form of stdout when the manifest declares an `outputSchema`.

use enact_exec_core::Mount;
use enact_validate::ValidationIssue;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// What the caller wants exported from the container's filesystem.
#[derive(Debug, Clone, Default)]
pub struct OutputRequest {
    /// Host directory to export the container's `/output` directory into.
    pub output_path: Option<PathBuf>,
    /// `container-relative path under /output -> host destination path`.
    pub named_exports: BTreeMap<String, PathBuf>,
}

/// Builds the `/output` bind mount for `request`, if one was asked for.
/// The mount is read-write since the container populates it during the run.
#[must_use]
pub fn output_mount(request: &OutputRequest) -> Option<Mount> {
    request.output_path.as_ref().map(|path| Mount {
        host_path: path.clone(),
        container_path: "/output".to_string(),
        read_only: false,
    })
}

/// Copies each named export from the mounted `/output` host directory to its
/// requested destination. Returns the names that failed to export rather
/// than aborting at the first failure, since a missing named output should
/// not mask the rest.
pub fn export_named_files(
    output_host_dir: &Path,
    named_exports: &BTreeMap<String, PathBuf>,
) -> Vec<String> {
    let mut failed = Vec::new();
    for (name, dest) in named_exports {
        let src = output_host_dir.join(name);
        if std::fs::copy(&src, dest).is_err() {
            failed.push(name.clone());
        }
    }
    failed
}

/// Parsed-and-validated form of a skill's stdout, attached to the result
/// when the manifest declares an `outputSchema`.
#[derive(Debug, Clone)]
pub struct ParsedOutput {
    /// Stdout parsed as JSON, if it parses.
    pub parsed: Option<serde_json::Value>,
    /// Schema violations found against `outputSchema`. Non-empty violations
    /// are reported but never fail the call.
    pub schema_issues: Vec<ValidationIssue>,
}

/// Attempts to parse `stdout` as JSON and, if both parsing succeeds and
/// `output_schema` is present, validates the parsed value against it.
#[must_use]
pub fn parse_and_validate_output(
    stdout: &[u8],
    output_schema: Option<&serde_json::Value>,
) -> ParsedOutput {
    let parsed: Option<serde_json::Value> = serde_json::from_slice(stdout).ok();

    let schema_issues = match (&parsed, output_schema) {
        (Some(value), Some(schema)) => enact_validate::validate(schema, value)
            .map(|report| report.issues)
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    ParsedOutput {
        parsed,
        schema_issues,
    }
}
