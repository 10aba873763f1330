// SPDX-License-Identifier: MIT OR Apache-2.0
//! Deterministic tar+gzip packing for skill bundles.
//!
//! A bundle is a gzip-compressed tar archive of a skill directory, built so
//! that packing the same tree twice always produces byte-identical output:
//! entries are sorted by relative path, symlinks are dereferenced, and
//! ownership/mtime/permission metadata is normalised. The resulting archive's
//! SHA-256 hash is the bundle's content address.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use anyhow::{Context, Result};
use enact_core::{sha256_hex, Bundle};
use enact_glob::IncludeExcludeGlobs;
use flate2::read::GzDecoder;
use flate2::{Compression, GzBuilder};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::Path;
use tar::{Builder, EntryType, Header};
use walkdir::WalkDir;

/// Regular-file mode applied to every packed file that isn't executable.
const MODE_FILE: u32 = 0o644;
/// Regular-file mode applied to every packed file with any owner/group/other
/// executable bit set in its source permissions.
const MODE_EXEC: u32 = 0o755;

/// A packed bundle: the gzip+tar archive bytes plus its content address.
#[derive(Debug, Clone)]
pub struct PackedBundle {
    /// Gzip-compressed tar archive bytes, suitable for storage/transport.
    pub archive: Vec<u8>,
    /// Content address and size of the uncompressed tar archive that
    /// `archive` decompresses to.
    pub bundle: Bundle,
}

/// Pack `root` into a deterministic bundle archive.
///
/// Walks `root` (dereferencing symlinks), keeps only paths allowed by
/// `globs`, and writes them into a tar archive in sorted order with
/// zeroed uid/gid/mtime and normalised permissions. The tar stream is then
/// gzip-compressed with a fixed mtime so the resulting bytes are a pure
/// function of file contents and names.
///
/// # Errors
///
/// Returns an error if `root` cannot be walked, a file cannot be read, or
/// archive construction fails.
pub fn pack_dir(root: &Path, globs: &IncludeExcludeGlobs) -> Result<PackedBundle> {
    let mut entries = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.file_name() != std::ffi::OsStr::new(".git"));

    for entry in walker {
        let entry = entry.with_context(|| format!("walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let abs = entry.path();
        let rel = abs.strip_prefix(root).unwrap_or(abs).to_path_buf();
        if rel.as_os_str().is_empty() {
            continue;
        }
        if !globs.decide_path(&rel).is_allowed() {
            continue;
        }
        entries.push((rel, abs.to_path_buf()));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    tracing::debug!(count = entries.len(), root = %root.display(), "packing bundle");

    let mut tar_bytes = Vec::new();
    {
        let mut builder = Builder::new(&mut tar_bytes);
        for (rel, abs) in &entries {
            let content = fs::read(abs).with_context(|| format!("read {}", abs.display()))?;
            let mode = exec_mode(abs).unwrap_or(MODE_FILE);

            let mut header = Header::new_gnu();
            header.set_entry_type(EntryType::Regular);
            header.set_size(content.len() as u64);
            header.set_mode(mode);
            header.set_uid(0);
            header.set_gid(0);
            header.set_mtime(0);
            header.set_cksum();

            builder
                .append_data(&mut header, rel, content.as_slice())
                .with_context(|| format!("append {}", rel.display()))?;
        }
        builder.finish().context("finalize tar archive")?;
    }

    let hash = sha256_hex(&tar_bytes);
    let bundle = Bundle {
        hash,
        size: tar_bytes.len() as u64,
    };

    let mut gz = GzBuilder::new().mtime(0).write(Vec::new(), Compression::default());
    std::io::Write::write_all(&mut gz, &tar_bytes).context("gzip bundle")?;
    let archive = gz.finish().context("finalize gzip stream")?;

    Ok(PackedBundle { archive, bundle })
}

#[cfg(unix)]
fn exec_mode(path: &Path) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    let meta = fs::metadata(path).ok()?;
    let mode = meta.permissions().mode();
    if mode & 0o111 != 0 {
        Some(MODE_EXEC)
    } else {
        Some(MODE_FILE)
    }
}

#[cfg(not(unix))]
fn exec_mode(_path: &Path) -> Option<u32> {
    None
}

/// Verify that gzip-compressed `archive` decompresses to the uncompressed
/// content address recorded in `bundle`.
#[must_use]
pub fn verify(archive: &[u8], bundle: &Bundle) -> bool {
    let mut decoder = GzDecoder::new(archive);
    let mut tar_bytes = Vec::new();
    if decoder.read_to_end(&mut tar_bytes).is_err() {
        return false;
    }
    tar_bytes.len() as u64 == bundle.size && sha256_hex(&tar_bytes) == bundle.hash
}

/// Compute the SHA-256 of an in-memory byte slice, matching [`sha256_hex`].
#[must_use]
pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Extract a packed bundle archive into `dest`, which must already exist.
///
/// # Errors
///
/// Returns an error if the archive is not valid gzip+tar or extraction fails.
pub fn unpack(archive: &[u8], dest: &Path) -> Result<()> {
    let decoder = GzDecoder::new(archive);
    let mut tar = tar::Archive::new(decoder);
    tar.unpack(dest).with_context(|| format!("extract bundle into {}", dest.display()))?;
    Ok(())
}

/// Read the uncompressed tar entry list of a packed bundle, in archive order
/// (which, for bundles produced by [`pack_dir`], is also sorted order).
///
/// # Errors
///
/// Returns an error if the archive cannot be decoded.
pub fn list_entries(archive: &[u8]) -> Result<Vec<String>> {
    let decoder = GzDecoder::new(archive);
    let mut tar = tar::Archive::new(decoder);
    let mut names = Vec::new();
    for entry in tar.entries().context("read tar entries")? {
        let entry = entry.context("read tar entry")?;
        let path = entry.path().context("read entry path")?;
        names.push(path.to_string_lossy().into_owned());
    }
    Ok(names)
}

/// Read a single file's contents out of a packed bundle without extracting
/// the whole archive to disk.
///
/// # Errors
///
/// Returns an error if the archive cannot be decoded or `path` is absent.
pub fn read_entry(archive: &[u8], path: &str) -> Result<Vec<u8>> {
    let decoder = GzDecoder::new(archive);
    let mut tar = tar::Archive::new(decoder);
    for entry in tar.entries().context("read tar entries")? {
        let mut entry = entry.context("read tar entry")?;
        let entry_path = entry.path().context("read entry path")?.to_string_lossy().into_owned();
        if entry_path == path {
            let mut buf = Vec::new();
            entry.read_to_end(&mut buf).context("read entry contents")?;
            return Ok(buf);
        }
    }
    anyhow::bail!("entry not found in bundle: {path}")
}
