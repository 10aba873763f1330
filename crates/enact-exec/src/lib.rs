// SPDX-License-Identifier: MIT OR Apache-2.0
//! enact-exec
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Runs a validated manifest against caller inputs inside a container:
//! resolve base image, build, mount, run the command, capture output.
//! State machine per execution: `resolving -> pulling -> building -> running
//! -> complete | failed | timed_out | build_error`. Enact implements no
//! container runtime of its own; [`ShellOciRuntime`] shells out to whatever
//! OCI tool (`docker`, `podman`, ...) the host provides, and any deployment
//! can supply its own [`ContainerRuntime`] instead.

pub mod build;
pub mod health;
pub mod mount;
pub mod output;
mod shell_runtime;
pub mod state;

pub use enact_exec_core::{ContainerRuntime, ContainerSpec, Mount, RuntimeError};
pub use health::{Health, HealthTracker};
pub use mount::{CallerInput, InputLabel, MountError};
pub use output::{OutputRequest, ParsedOutput};
pub use shell_runtime::ShellOciRuntime;
pub use state::{ExecutionState, ExecutionTracker, InvalidTransition};

use chrono::{DateTime, Utc};
use enact_error::ErrorCode;
use enact_interp::Binding;
use enact_manifest::{CommandSpec, Manifest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{info, warn};
use uuid::Uuid;

/// Everything needed to execute one manifest invocation.
pub struct ExecutionRequest {
    /// The validated manifest to run.
    pub manifest: Manifest,
    /// Bindings for an array-form `{{param}}` command.
    pub param_bindings: BTreeMap<String, Binding>,
    /// Values for a string-form `${name}` command.
    pub string_values: BTreeMap<String, serde_json::Value>,
    /// Caller-supplied input paths to mount.
    pub caller_inputs: Vec<CallerInput>,
    /// Caller-supplied values for manifest-declared environment variables.
    pub env_values: BTreeMap<String, String>,
    /// Additional environment overrides, merged in last.
    pub env_overrides: BTreeMap<String, String>,
    /// Requested output export.
    pub output_request: OutputRequest,
    /// Overrides the manifest's own `timeout`, if present.
    pub timeout_override: Option<Duration>,
    /// Resolves when the caller wants to cancel the run.
    pub cancel: Option<oneshot::Receiver<()>>,
}

impl ExecutionRequest {
    /// A request with no inputs, overrides, or cancellation — only `manifest`.
    #[must_use]
    pub fn new(manifest: Manifest) -> Self {
        Self {
            manifest,
            param_bindings: BTreeMap::new(),
            string_values: BTreeMap::new(),
            caller_inputs: Vec::new(),
            env_values: BTreeMap::new(),
            env_overrides: BTreeMap::new(),
            output_request: OutputRequest::default(),
            timeout_override: None,
            cancel: None,
        }
    }
}

/// Captured process output, plus the parsed-and-validated form when the
/// manifest declares an `outputSchema`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutput {
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error.
    pub stderr: Vec<u8>,
    /// Process exit code, absent on timeout.
    pub exit_code: Option<i32>,
    /// Stdout parsed as JSON and validated against `outputSchema`, if present.
    pub parsed: Option<serde_json::Value>,
}

/// Metadata describing the execution, independent of whether it succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    /// The manifest's name.
    pub tool_name: String,
    /// The manifest's version.
    pub tool_version: String,
    /// Image the command ran under (post-build, if a build phase ran).
    pub container_image: String,
    /// When execution began.
    pub start_time: DateTime<Utc>,
    /// When execution ended.
    pub end_time: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// `true` if the build phase was served from cache.
    pub cached: bool,
    /// Unique identifier for this execution.
    pub execution_id: Uuid,
}

/// Structured error body, mirroring the registry service's `{code, message,
/// details?}` shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionErrorBody {
    /// Stable machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Structured context (e.g. a build failure's step index and command).
    pub details: Option<serde_json::Value>,
}

/// Outcome of one execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// `true` iff the engine completed without a build/runtime/timeout error.
    /// A non-zero exit code from the skill itself does not make this `false`.
    pub success: bool,
    /// Captured output, when execution reached the run phase.
    pub output: ExecutionOutput,
    /// Execution metadata.
    pub metadata: ExecutionMetadata,
    /// Present iff `success` is `false`.
    pub error: Option<ExecutionErrorBody>,
}

/// Parses a manifest duration string (`"30s"`, `"5m"`, `"1h"`) into a
/// [`Duration`]. A bare integer is interpreted as seconds.
#[must_use]
pub fn parse_duration(text: &str) -> Option<Duration> {
    let text = text.trim();
    let (digits, unit) = match text.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => (&text[..text.len() - 1], c),
        _ => (text, 's'),
    };
    let value: u64 = digits.parse().ok()?;
    let seconds = match unit {
        's' => value,
        'm' => value.checked_mul(60)?,
        'h' => value.checked_mul(3600)?,
        _ => return None,
    };
    Some(Duration::from_secs(seconds))
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Executes manifests against a pluggable [`ContainerRuntime`] and tracks
/// engine health across calls.
pub struct ExecutionEngine {
    runtime: Arc<dyn ContainerRuntime>,
    health: Mutex<HealthTracker>,
}

impl ExecutionEngine {
    /// Create an engine around `runtime`.
    #[must_use]
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        let health = HealthTracker::new(runtime.name().to_string());
        Self {
            runtime,
            health: Mutex::new(health),
        }
    }

    /// Current health snapshot.
    #[must_use]
    pub fn health(&self) -> Health {
        self.health.lock().expect("health lock poisoned").health()
    }

    /// Runs `request` through resolve/pull/build/mount/run/output phases.
    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        let execution_id = Uuid::new_v4();
        let start_time = Utc::now();
        let mut tracker = ExecutionTracker::new();
        let base_image = request
            .manifest
            .from
            .clone()
            .unwrap_or_else(|| "alpine:latest".to_string());

        info!(
            tool = %request.manifest.name,
            version = %request.manifest.version,
            image = %base_image,
            "resolving execution"
        );

        tracker
            .transition(ExecutionState::Pulling)
            .expect("resolving -> pulling is always valid");
        if let Err(e) = self.runtime.pull(&base_image).await {
            return self.finish_error(
                execution_id,
                start_time,
                &request.manifest,
                &base_image,
                false,
                e.code(),
                e.to_string(),
                None,
            );
        }

        let mut cached = false;
        let image_ref = if request.manifest.build.is_empty() {
            base_image.clone()
        } else {
            tracker
                .transition(ExecutionState::Building)
                .expect("pulling -> building is always valid");
            match build::run_build(self.runtime.as_ref(), &base_image, &request.manifest.build).await {
                Ok(outcome) => {
                    cached = outcome.cached;
                    outcome.image_ref
                }
                Err(e) => {
                    tracker
                        .transition(ExecutionState::BuildFailed)
                        .expect("building -> build_error is always valid");
                    return self.finish_error(
                        execution_id,
                        start_time,
                        &request.manifest,
                        &base_image,
                        false,
                        e.code(),
                        e.to_string(),
                        build_error_details(&e),
                    );
                }
            }
        };

        let env = match mount::resolve_env(&request.manifest.env, &request.env_values, &request.env_overrides) {
            Ok(env) => env,
            Err(e) => {
                return self.finish_error(
                    execution_id,
                    start_time,
                    &request.manifest,
                    &image_ref,
                    cached,
                    ErrorCode::ValidationError,
                    e.to_string(),
                    None,
                );
            }
        };

        let mut mounts = mount::build_mounts(&request.caller_inputs);
        let output_host_dir = request.output_request.output_path.clone();
        if let Some(m) = output::output_mount(&request.output_request) {
            mounts.push(m);
        }

        let argv = match build_argv(&request.manifest.command, &request.param_bindings, &request.string_values) {
            Ok(argv) => argv,
            Err((code, message)) => {
                return self.finish_error(
                    execution_id,
                    start_time,
                    &request.manifest,
                    &image_ref,
                    cached,
                    code,
                    message,
                    None,
                );
            }
        };

        let spec = ContainerSpec {
            image: image_ref.clone(),
            argv,
            env,
            mounts,
            workdir: None,
        };

        tracker
            .transition(ExecutionState::Running)
            .expect("building/pulling -> running is always valid");

        let timeout = request
            .timeout_override
            .or_else(|| request.manifest.timeout.as_deref().and_then(parse_duration))
            .unwrap_or(DEFAULT_TIMEOUT);

        let run_future = self.runtime.run(&spec, timeout);
        let outcome = if let Some(cancel) = request.cancel {
            tokio::select! {
                result = run_future => result,
                _ = cancel => {
                    return self.finish_error(
                        execution_id,
                        start_time,
                        &request.manifest,
                        &image_ref,
                        cached,
                        ErrorCode::Cancelled,
                        "execution cancelled by caller".to_string(),
                        None,
                    );
                }
            }
        } else {
            run_future.await
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                return self.finish_error(
                    execution_id,
                    start_time,
                    &request.manifest,
                    &image_ref,
                    cached,
                    e.code(),
                    e.to_string(),
                    None,
                );
            }
        };

        if outcome.timed_out {
            tracker
                .transition(ExecutionState::TimedOut)
                .expect("running -> timed_out is always valid");
            return self.finish_error(
                execution_id,
                start_time,
                &request.manifest,
                &image_ref,
                cached,
                ErrorCode::Timeout,
                "execution exceeded its wall-clock deadline".to_string(),
                None,
            );
        }

        let failed_exports = export_named(&output_host_dir, &request.output_request.named_exports);
        if !failed_exports.is_empty() {
            warn!(?failed_exports, "some named outputs failed to export");
        }

        let parsed = output::parse_and_validate_output(&outcome.stdout, request.manifest.output_schema.as_ref());
        if !parsed.schema_issues.is_empty() {
            warn!(issues = parsed.schema_issues.len(), "output schema validation reported issues");
        }

        tracker
            .transition(ExecutionState::Complete)
            .expect("running -> complete is always valid");
        let end_time = Utc::now();
        self.health
            .lock()
            .expect("health lock poisoned")
            .record_success(end_time);

        ExecutionResult {
            success: true,
            output: ExecutionOutput {
                stdout: outcome.stdout,
                stderr: outcome.stderr,
                exit_code: outcome.exit_code,
                parsed: parsed.parsed,
            },
            metadata: ExecutionMetadata {
                tool_name: request.manifest.name.clone(),
                tool_version: request.manifest.version.clone(),
                container_image: image_ref,
                start_time,
                end_time,
                duration_ms: (end_time - start_time).num_milliseconds().max(0) as u64,
                cached,
                execution_id,
            },
            error: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn finish_error(
        &self,
        execution_id: Uuid,
        start_time: DateTime<Utc>,
        manifest: &Manifest,
        image: &str,
        cached: bool,
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    ) -> ExecutionResult {
        self.health
            .lock()
            .expect("health lock poisoned")
            .record_failure(message.clone());
        let end_time = Utc::now();
        ExecutionResult {
            success: false,
            output: ExecutionOutput {
                stdout: Vec::new(),
                stderr: Vec::new(),
                exit_code: None,
                parsed: None,
            },
            metadata: ExecutionMetadata {
                tool_name: manifest.name.clone(),
                tool_version: manifest.version.clone(),
                container_image: image.to_string(),
                start_time,
                end_time,
                duration_ms: (end_time - start_time).num_milliseconds().max(0) as u64,
                cached,
                execution_id,
            },
            error: Some(ExecutionErrorBody { code, message, details }),
        }
    }
}

fn build_error_details(e: &RuntimeError) -> Option<serde_json::Value> {
    if let RuntimeError::BuildError { index, command, exit_code, stdout, stderr } = e {
        Some(serde_json::json!({
            "stepIndex": index,
            "command": command,
            "exitCode": exit_code,
            "stdout": stdout,
            "stderr": stderr,
        }))
    } else {
        None
    }
}

fn export_named(
    output_dir: &Option<std::path::PathBuf>,
    named_exports: &BTreeMap<String, std::path::PathBuf>,
) -> Vec<String> {
    match output_dir {
        Some(dir) if !named_exports.is_empty() => output::export_named_files(dir, named_exports),
        _ => Vec::new(),
    }
}

fn build_argv(
    command: &Option<CommandSpec>,
    param_bindings: &BTreeMap<String, Binding>,
    string_values: &BTreeMap<String, serde_json::Value>,
) -> Result<Vec<String>, (ErrorCode, String)> {
    match command {
        Some(CommandSpec::Array(tokens)) => enact_interp::interpolate_array(tokens, param_bindings)
            .map_err(|e| (e.code(), e.to_string())),
        Some(CommandSpec::String(template)) => {
            let rendered = enact_interp::interpolate_string(template, string_values);
            Ok(vec!["sh".to_string(), "-c".to_string(), rendered])
        }
        None => Ok(Vec::new()),
    }
}
