// SPDX-License-Identifier: MIT OR Apache-2.0
//! enact-exec-core
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The [`ContainerRuntime`] trait and the types that cross its boundary.
//! Enact never implements its own container runtime — deployments plug in
//! whatever OCI tool they have (Docker, Podman, nerdctl); `enact-exec` ships
//! a default implementation that shells out to one, and `enact-exec-mock`
//! ships an in-memory double for tests that never spawns a real process.

use async_trait::async_trait;
use enact_error::ErrorCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// A single bind mount from the host into the container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mount {
    /// Path on the host.
    pub host_path: PathBuf,
    /// Path inside the container, e.g. `/input` or `/inputs/dataset`.
    pub container_path: String,
    /// Whether the mount is read-only.
    pub read_only: bool,
}

/// Everything needed to run one container invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Image reference to run (the build phase's output image, or `from`
    /// unchanged when there is no build phase).
    pub image: String,
    /// Argv to execute inside the container. Never passed through a shell.
    pub argv: Vec<String>,
    /// Environment variables, already resolved (defaults applied, secrets
    /// carried as opaque references, caller overrides merged last).
    pub env: BTreeMap<String, String>,
    /// Input/output bind mounts.
    pub mounts: Vec<Mount>,
    /// Working directory inside the container, if any.
    pub workdir: Option<String>,
}

/// Result of running a container to completion (or to a captured timeout).
#[derive(Debug, Clone, Default)]
pub struct ContainerOutcome {
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error.
    pub stderr: Vec<u8>,
    /// Process exit code, when the container exited normally.
    pub exit_code: Option<i32>,
    /// `true` if the container was terminated for exceeding its deadline.
    pub timed_out: bool,
}

/// Outcome of a single build step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStepResult {
    /// Zero-based index of the step within the manifest's `build` list.
    pub index: usize,
    /// The shell command that was run.
    pub command: String,
    /// Exit code of the step.
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

/// Outcome of the build phase.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// Reference to the resulting image.
    pub image_ref: String,
    /// Per-step results, in order.
    pub steps: Vec<BuildStepResult>,
    /// `true` if the build was served from cache without re-running steps.
    pub cached: bool,
}

/// Errors a [`ContainerRuntime`] implementation can raise.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    /// The configured OCI runtime binary could not be found or invoked.
    #[error("container runtime not found: {0}")]
    RuntimeNotFound(String),
    /// A build step exited non-zero.
    #[error("build step {index} failed (exit {exit_code}): {command}")]
    BuildError {
        /// Index of the failing step.
        index: usize,
        /// The command that failed.
        command: String,
        /// Exit code returned by the step.
        exit_code: i32,
        /// Captured stdout up to the failure.
        stdout: String,
        /// Captured stderr up to the failure.
        stderr: String,
    },
    /// The container runtime itself failed, distinct from the skill's own
    /// non-zero exit (which is reported in the execution result).
    #[error("container runtime error: {0}")]
    ContainerError(String),
    /// Execution exceeded its wall-clock deadline.
    #[error("execution timed out")]
    Timeout,
    /// Execution was cancelled by the caller.
    #[error("execution cancelled")]
    Cancelled,
}

impl RuntimeError {
    /// Maps this error onto the shared stable error-code taxonomy.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::RuntimeNotFound(_) => ErrorCode::RuntimeNotFound,
            Self::BuildError { .. } => ErrorCode::BuildError,
            Self::ContainerError(_) => ErrorCode::ContainerError,
            Self::Timeout => ErrorCode::Timeout,
            Self::Cancelled => ErrorCode::Cancelled,
        }
    }
}

/// Pluggable container runtime: pull a base image, run a build phase against
/// it, and run a single command inside an image with mounts and environment.
///
/// Implementations are never asked to implement an actual container engine —
/// only to drive one that already exists on the host.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Human-readable name of the runtime (e.g. `"docker"`, `"podman"`, `"mock"`).
    fn name(&self) -> &str;

    /// Pulls `image` if it is not already present locally.
    async fn pull(&self, image: &str) -> Result<(), RuntimeError>;

    /// Runs `steps` as sequential shell commands against `base_image`,
    /// producing a new image. `cache_key` identifies a previous build this
    /// call may reuse in full if its steps are unchanged.
    async fn build(
        &self,
        base_image: &str,
        steps: &[String],
        cache_key: &str,
    ) -> Result<BuildOutcome, RuntimeError>;

    /// Runs `spec` to completion or until `timeout` elapses.
    async fn run(
        &self,
        spec: &ContainerSpec,
        timeout: Duration,
    ) -> Result<ContainerOutcome, RuntimeError>;
}
