// SPDX-License-Identifier: MIT OR Apache-2.0
//! Default [`ContainerRuntime`] implementation: shells out to an external
//! OCI tool (`docker`, `podman`, ...) via [`tokio::process::Command`].
//! Enact never implements its own container runtime; this is the thinnest
//! layer that drives one that already exists on the host.

use async_trait::async_trait;
use enact_exec_core::{BuildOutcome, BuildStepResult, ContainerOutcome, ContainerRuntime, ContainerSpec, RuntimeError};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Drives a locally installed OCI CLI (default `docker`) as the container
/// runtime.
#[derive(Debug, Clone)]
pub struct ShellOciRuntime {
    binary: String,
}

impl ShellOciRuntime {
    /// Use `binary` (e.g. `"docker"`, `"podman"`, `"nerdctl"`) as the OCI CLI.
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

impl Default for ShellOciRuntime {
    fn default() -> Self {
        Self::new("docker")
    }
}

struct CapturedOutput {
    exit_code: i32,
    stdout: String,
    stderr: String,
}

async fn run_capturing(binary: &str, args: &[String]) -> Result<CapturedOutput, RuntimeError> {
    debug!(binary, args = ?args, "invoking oci runtime");
    let output = Command::new(binary)
        .args(args)
        .output()
        .await
        .map_err(|e| RuntimeError::RuntimeNotFound(format!("{binary}: {e}")))?;

    Ok(CapturedOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

fn mount_args(mount: &enact_exec_core::Mount) -> Vec<String> {
    let suffix = if mount.read_only { ":ro" } else { "" };
    vec![
        "-v".to_string(),
        format!("{}:{}{}", mount.host_path.display(), mount.container_path, suffix),
    ]
}

#[async_trait]
impl ContainerRuntime for ShellOciRuntime {
    fn name(&self) -> &str {
        &self.binary
    }

    async fn pull(&self, image: &str) -> Result<(), RuntimeError> {
        info!(image, "pulling image");
        let result = run_capturing(&self.binary, &["pull".to_string(), image.to_string()]).await?;
        if result.exit_code != 0 {
            return Err(RuntimeError::ContainerError(format!(
                "pull failed (exit {}): {}",
                result.exit_code, result.stderr
            )));
        }
        Ok(())
    }

    async fn build(
        &self,
        base_image: &str,
        steps: &[String],
        cache_key: &str,
    ) -> Result<BuildOutcome, RuntimeError> {
        debug!(base_image, cache_key, "running build phase");
        let mut results = Vec::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            let args = vec![
                "run".to_string(),
                "--rm".to_string(),
                base_image.to_string(),
                "sh".to_string(),
                "-c".to_string(),
                step.clone(),
            ];
            let output = run_capturing(&self.binary, &args).await?;
            if output.exit_code != 0 {
                return Err(RuntimeError::BuildError {
                    index,
                    command: step.clone(),
                    exit_code: output.exit_code,
                    stdout: output.stdout,
                    stderr: output.stderr,
                });
            }
            results.push(BuildStepResult {
                index,
                command: step.clone(),
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        Ok(BuildOutcome {
            image_ref: base_image.to_string(),
            steps: results,
            cached: false,
        })
    }

    async fn run(
        &self,
        spec: &ContainerSpec,
        timeout: Duration,
    ) -> Result<ContainerOutcome, RuntimeError> {
        let mut args = vec!["run".to_string(), "--rm".to_string()];
        for mount in &spec.mounts {
            args.extend(mount_args(mount));
        }
        for (key, value) in &spec.env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        if let Some(workdir) = &spec.workdir {
            args.push("-w".to_string());
            args.push(workdir.clone());
        }
        args.push(spec.image.clone());
        args.extend(spec.argv.clone());

        info!(image = %spec.image, "running container");
        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RuntimeError::RuntimeNotFound(format!("{}: {e}", self.binary)))?;

        let mut stdout_pipe = child.stdout.take().expect("stdout was piped");
        let mut stderr_pipe = child.stderr.take().expect("stderr was piped");
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stdout_pipe.read_to_end(&mut buf).await;
            buf
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr_pipe.read_to_end(&mut buf).await;
            buf
        });

        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => Ok(ContainerOutcome {
                stdout: stdout_task.await.unwrap_or_default(),
                stderr: stderr_task.await.unwrap_or_default(),
                exit_code: status.code(),
                timed_out: false,
            }),
            Ok(Err(e)) => Err(RuntimeError::ContainerError(e.to_string())),
            Err(_elapsed) => {
                warn!(image = %spec.image, "execution exceeded deadline, killing container");
                let _ = child.kill().await;
                Ok(ContainerOutcome {
                    stdout: stdout_task.await.unwrap_or_default(),
                    stderr: stderr_task.await.unwrap_or_default(),
                    exit_code: None,
                    timed_out: true,
                })
            }
        }
    }
}
