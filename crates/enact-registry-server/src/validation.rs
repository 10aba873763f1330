// SPDX-License-Identifier: MIT OR Apache-2.0
//! Request validation for the registry HTTP API.

use enact_core::Visibility;

/// Maximum accepted size for an uploaded manifest, in bytes.
const MAX_MANIFEST_BYTES: usize = 256 * 1024;

/// Maximum accepted size for an uploaded bundle archive, in bytes.
const MAX_BUNDLE_BYTES: usize = 64 * 1024 * 1024;

/// Maximum length of a free-text search query.
const MAX_QUERY_LENGTH: usize = 256;

/// Validates incoming registry API requests before they reach storage.
pub struct RequestValidator;

impl RequestValidator {
    /// Validates the raw parts of a publish request, accumulating every
    /// problem found rather than stopping at the first.
    pub fn validate_publish(raw_manifest: &[u8], bundle: &[u8]) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if raw_manifest.is_empty() {
            errors.push("manifest must not be empty".into());
        } else if raw_manifest.len() > MAX_MANIFEST_BYTES {
            errors.push(format!(
                "manifest exceeds maximum size of {MAX_MANIFEST_BYTES} bytes"
            ));
        }

        if bundle.is_empty() {
            errors.push("bundle must not be empty".into());
        } else if bundle.len() > MAX_BUNDLE_BYTES {
            errors.push(format!(
                "bundle exceeds maximum size of {MAX_BUNDLE_BYTES} bytes"
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validates a search query string's length. Empty is always valid (it
    /// selects browse mode).
    pub fn validate_search_query(q: &str) -> Result<(), String> {
        if q.len() > MAX_QUERY_LENGTH {
            return Err(format!(
                "query exceeds maximum length of {MAX_QUERY_LENGTH} characters"
            ));
        }
        Ok(())
    }

    /// Validates a visibility string from a `PATCH .../visibility` body.
    pub fn validate_visibility(raw: &str) -> Result<Visibility, String> {
        match raw {
            "public" => Ok(Visibility::Public),
            "unlisted" => Ok(Visibility::Unlisted),
            "private" => Ok(Visibility::Private),
            other => Err(format!(
                "unknown visibility {other:?}, expected one of public, unlisted, private"
            )),
        }
    }

    /// Validates a yank request's `reason` field.
    pub fn validate_yank_reason(reason: &str) -> Result<(), String> {
        if reason.trim().is_empty() {
            return Err("reason must not be empty".into());
        }
        Ok(())
    }
}
