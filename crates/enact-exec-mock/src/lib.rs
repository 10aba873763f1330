// SPDX-License-Identifier: MIT OR Apache-2.0
//! enact-exec-mock
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! An in-memory [`ContainerRuntime`] double for exercising the execution
//! engine in unit tests without spawning a real container process.

use async_trait::async_trait;
use enact_exec_core::{BuildOutcome, ContainerOutcome, ContainerRuntime, ContainerSpec, RuntimeError};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Default)]
struct Calls {
    pulls: Vec<String>,
    builds: Vec<(String, Vec<String>)>,
    runs: Vec<ContainerSpec>,
}

/// A scriptable [`ContainerRuntime`] that never spawns a real process.
///
/// Every phase returns a canned, successful result unless overridden via the
/// `with_*` builder methods, and every call is recorded for later assertion.
pub struct MockRuntime {
    calls: Mutex<Calls>,
    pull_result: Result<(), RuntimeError>,
    build_result: Result<BuildOutcome, RuntimeError>,
    run_result: Result<ContainerOutcome, RuntimeError>,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Calls::default()),
            pull_result: Ok(()),
            build_result: Ok(BuildOutcome {
                image_ref: "mock:built".to_string(),
                steps: Vec::new(),
                cached: false,
            }),
            run_result: Ok(ContainerOutcome {
                stdout: Vec::new(),
                stderr: Vec::new(),
                exit_code: Some(0),
                timed_out: false,
            }),
        }
    }
}

impl MockRuntime {
    /// A runtime with all-default successful results.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the pull phase to fail.
    #[must_use]
    pub fn with_pull_failure(mut self, err: RuntimeError) -> Self {
        self.pull_result = Err(err);
        self
    }

    /// Script the build phase's result.
    #[must_use]
    pub fn with_build_result(mut self, result: Result<BuildOutcome, RuntimeError>) -> Self {
        self.build_result = result;
        self
    }

    /// Script the run phase to return `stdout` with exit code `exit_code`.
    #[must_use]
    pub fn with_run_output(mut self, stdout: impl Into<Vec<u8>>, exit_code: i32) -> Self {
        self.run_result = Ok(ContainerOutcome {
            stdout: stdout.into(),
            stderr: Vec::new(),
            exit_code: Some(exit_code),
            timed_out: false,
        });
        self
    }

    /// Script the run phase to report a timeout.
    #[must_use]
    pub fn with_run_timeout(mut self) -> Self {
        self.run_result = Ok(ContainerOutcome {
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: None,
            timed_out: true,
        });
        self
    }

    /// Image references passed to [`ContainerRuntime::pull`], in call order.
    #[must_use]
    pub fn pull_calls(&self) -> Vec<String> {
        self.calls.lock().expect("mock lock poisoned").pulls.clone()
    }

    /// `(base_image, steps)` pairs passed to [`ContainerRuntime::build`].
    #[must_use]
    pub fn build_calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().expect("mock lock poisoned").builds.clone()
    }

    /// Specs passed to [`ContainerRuntime::run`], in call order.
    #[must_use]
    pub fn run_calls(&self) -> Vec<ContainerSpec> {
        self.calls.lock().expect("mock lock poisoned").runs.clone()
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    fn name(&self) -> &str {
        "mock"
    }

    async fn pull(&self, image: &str) -> Result<(), RuntimeError> {
        self.calls.lock().expect("mock lock poisoned").pulls.push(image.to_string());
        self.pull_result.clone()
    }

    async fn build(
        &self,
        base_image: &str,
        steps: &[String],
        _cache_key: &str,
    ) -> Result<BuildOutcome, RuntimeError> {
        self.calls
            .lock()
            .expect("mock lock poisoned")
            .builds
            .push((base_image.to_string(), steps.to_vec()));
        self.build_result.clone()
    }

    async fn run(
        &self,
        spec: &ContainerSpec,
        _timeout: Duration,
    ) -> Result<ContainerOutcome, RuntimeError> {
        self.calls.lock().expect("mock lock poisoned").runs.push(spec.clone());
        self.run_result.clone()
    }
}
