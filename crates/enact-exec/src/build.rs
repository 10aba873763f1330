// SPDX-License-Identifier: MIT OR Apache-2.0
//! Build phase: runs a manifest's `build` steps in sequence against the base
//! image, with cache reuse keyed on the steps themselves.

use enact_core::sha256_hex;
use enact_exec_core::{BuildOutcome, ContainerRuntime, RuntimeError};

/// Computes a cache key for a build phase from the base image and its
/// ordered steps. Identical images and steps always produce the same key,
/// so a [`ContainerRuntime`] can serve a previous build without re-running
/// any step.
#[must_use]
pub fn cache_key(base_image: &str, steps: &[String]) -> String {
    let mut joined = base_image.to_string();
    for step in steps {
        joined.push('\n');
        joined.push_str(step);
    }
    sha256_hex(joined.as_bytes())
}

/// Runs the build phase for `base_image`/`steps` through `runtime`.
///
/// An empty `steps` list is a no-op: the base image is returned unchanged,
/// never passed to [`ContainerRuntime::build`].
pub async fn run_build(
    runtime: &dyn ContainerRuntime,
    base_image: &str,
    steps: &[String],
) -> Result<BuildOutcome, RuntimeError> {
    if steps.is_empty() {
        return Ok(BuildOutcome {
            image_ref: base_image.to_string(),
            steps: Vec::new(),
            cached: false,
        });
    }
    let key = cache_key(base_image, steps);
    runtime.build(base_image, steps, &key).await
}
