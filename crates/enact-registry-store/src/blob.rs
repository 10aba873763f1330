// SPDX-License-Identifier: MIT OR Apache-2.0
//! Content-addressed filesystem blob store for bundle archives.
//!
//! Layout: `<root>/bundles/<name>/<version>/bundle.tar.gz`. `name` has
//! already passed `enact_manifest`'s identifier grammar by the time it
//! reaches here, so it is safe to use directly as a relative path (no `..`,
//! no absolute segments) including its own `/`-separated namespace
//! segments.

use crate::StoreError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Filesystem-backed store for bundle archive bytes.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Create a blob store rooted at `root`. Does not touch the filesystem.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path to a version's bundle archive, whether or not it exists yet.
    #[must_use]
    pub fn bundle_path(&self, name: &str, version: &str) -> PathBuf {
        self.root.join("bundles").join(name).join(version).join("bundle.tar.gz")
    }

    /// Writes `bytes` to the bundle path for `(name, version)` atomically:
    /// written to a sibling temp file, then renamed into place.
    pub async fn write_bundle(&self, name: &str, version: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let dest = self.bundle_path(name, version);
        let dir = dest.parent().expect("bundle path always has a parent");
        fs::create_dir_all(dir).await?;

        let tmp_path = dir.join(format!(".bundle.tar.gz.{}.tmp", uuid::Uuid::new_v4()));
        {
            let mut tmp = fs::File::create(&tmp_path).await?;
            tmp.write_all(bytes).await?;
            tmp.flush().await?;
        }
        fs::rename(&tmp_path, &dest).await?;
        Ok(())
    }

    /// Reads a bundle's bytes. Returns [`StoreError::NotFound`] if absent.
    pub async fn read_bundle(&self, name: &str, version: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.bundle_path(name, version);
        fs::read(&path)
            .await
            .map_err(|_| StoreError::NotFound(format!("bundle for {name}@{version}")))
    }

    /// Removes every blob under a tool's directory (cascade on tool delete).
    /// A missing directory is not an error.
    pub async fn delete_tool_blobs(&self, name: &str) -> Result<(), StoreError> {
        let dir = self.root.join("bundles").join(name);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes a single version's blob directory. A missing directory is not
    /// an error.
    pub async fn delete_version_blob(&self, name: &str, version: &str) -> Result<(), StoreError> {
        let dir = self.root.join("bundles").join(name).join(version);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// The store's root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}
