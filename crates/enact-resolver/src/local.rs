// SPDX-License-Identifier: MIT OR Apache-2.0
//! Local tools directory lookup (§4.H tier 1).
//!
//! `~/.enact/tools/` holds skill directories checked out or authored
//! directly on disk. Every regular file under it is a candidate manifest;
//! the first one whose parsed `name` matches is the result. Files that
//! don't parse as a manifest (READMEs, scratch files, non-YAML frontmatter)
//! are skipped rather than treated as an error.

use crate::ResolverError;
use enact_manifest::Manifest;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A manifest found directly on disk, outside the cache.
pub struct LocalMatch {
    /// Parsed manifest.
    pub manifest: Manifest,
    /// Path to the manifest file that matched.
    pub manifest_path: PathBuf,
}

/// Walks `tools_dir` looking for a manifest whose `name` equals `target`.
///
/// Returns `Ok(None)` if `tools_dir` doesn't exist or nothing matches.
/// A file that fails to parse as a manifest is silently skipped; a file
/// that fails to *read* is reported.
pub fn find(tools_dir: &Path, target: &str) -> Result<Option<LocalMatch>, ResolverError> {
    if !tools_dir.exists() {
        return Ok(None);
    }

    let walker = WalkDir::new(tools_dir).follow_links(true).into_iter().filter_entry(|e| {
        e.file_name() != std::ffi::OsStr::new(".git") && e.file_name() != std::ffi::OsStr::new("node_modules")
    });

    for entry in walker {
        let entry = entry.map_err(|e| ResolverError::Io {
            path: tools_dir.to_path_buf(),
            source: std::io::Error::other(e),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let raw = match std::fs::read(path) {
            Ok(raw) => raw,
            Err(source) => return Err(ResolverError::Io { path: path.to_path_buf(), source }),
        };
        let Ok((manifest, _raw)) = enact_manifest::parse(&raw) else {
            continue;
        };
        if manifest.name == target {
            return Ok(Some(LocalMatch { manifest, manifest_path: path.to_path_buf() }));
        }
    }

    Ok(None)
}

/// Collects every distinct manifest `name` found under `tools_dir`, for use
/// as suggestion candidates. Unparseable files are skipped.
pub fn all_names(tools_dir: &Path) -> Vec<String> {
    if !tools_dir.exists() {
        return Vec::new();
    }
    let mut names = Vec::new();
    for entry in WalkDir::new(tools_dir).follow_links(true).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(raw) = std::fs::read(entry.path()) {
            if let Ok((manifest, _)) = enact_manifest::parse(&raw) {
                names.push(manifest.name);
            }
        }
    }
    names
}
