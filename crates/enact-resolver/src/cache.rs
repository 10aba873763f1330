// SPDX-License-Identifier: MIT OR Apache-2.0
//! On-disk download cache (§4.H tier 2).
//!
//! Layout: `<cache_dir>/<sanitized name>/<version>/{meta.json,manifest.yaml,
//! bundle.tar.gz}`. `meta.json` is a serialized [`LocalCacheEntry`] carrying
//! the TTL; writes go to a sibling temp file and are renamed into place so a
//! reader never observes a half-written entry.

use crate::ResolverError;
use chrono::{DateTime, Utc};
use enact_core::LocalCacheEntry;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Replaces every byte outside `[A-Za-z0-9._-]` with `_` so a hierarchical
/// tool name (`alice/hello`, `@acme/hello`) becomes a single safe path
/// segment.
pub(crate) fn sanitize(name: &str) -> String {
    name.chars().map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' }).collect()
}

fn entry_dir(cache_dir: &Path, name: &str, version: &str) -> PathBuf {
    cache_dir.join(sanitize(name)).join(version)
}

async fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<(), ResolverError> {
    let dir = dest.parent().expect("cache entry path always has a parent");
    fs::create_dir_all(dir).await.map_err(|source| ResolverError::Io { path: dir.to_path_buf(), source })?;

    let tmp_path = dir.join(format!(".{}.{}.tmp", dest.file_name().unwrap().to_string_lossy(), uuid::Uuid::new_v4()));
    {
        let mut tmp = fs::File::create(&tmp_path)
            .await
            .map_err(|source| ResolverError::Io { path: tmp_path.clone(), source })?;
        tmp.write_all(bytes).await.map_err(|source| ResolverError::Io { path: tmp_path.clone(), source })?;
        tmp.flush().await.map_err(|source| ResolverError::Io { path: tmp_path.clone(), source })?;
    }
    fs::rename(&tmp_path, dest).await.map_err(|source| ResolverError::Io { path: dest.to_path_buf(), source })?;
    Ok(())
}

/// Reads the cache entry for an exact `(name, version)`, if present.
pub async fn read_entry(cache_dir: &Path, name: &str, version: &str) -> Result<Option<LocalCacheEntry>, ResolverError> {
    let meta_path = entry_dir(cache_dir, name, version).join("meta.json");
    match fs::read(&meta_path).await {
        Ok(bytes) => {
            let entry = serde_json::from_slice(&bytes).map_err(|_| ResolverError::CorruptCache(meta_path))?;
            Ok(Some(entry))
        }
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ResolverError::Io { path: meta_path, source }),
    }
}

/// Finds the freshest non-expired cached version of `name`, across whatever
/// versions have been downloaded. Expired entries are skipped, not deleted
/// (that's [`cleanup`]'s job).
pub async fn freshest_for_name(
    cache_dir: &Path,
    name: &str,
    now: DateTime<Utc>,
) -> Result<Option<LocalCacheEntry>, ResolverError> {
    let dir = cache_dir.join(sanitize(name));
    let mut read_dir = match fs::read_dir(&dir).await {
        Ok(rd) => rd,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(ResolverError::Io { path: dir, source }),
    };

    let mut best: Option<LocalCacheEntry> = None;
    while let Some(version_dir) =
        read_dir.next_entry().await.map_err(|source| ResolverError::Io { path: dir.clone(), source })?
    {
        let meta_path = version_dir.path().join("meta.json");
        let Ok(bytes) = fs::read(&meta_path).await else { continue };
        let Ok(entry) = serde_json::from_slice::<LocalCacheEntry>(&bytes) else { continue };
        if entry.is_expired(now) {
            continue;
        }
        if best.as_ref().is_none_or(|b| entry.cached_at > b.cached_at) {
            best = Some(entry);
        }
    }
    Ok(best)
}

/// Writes a freshly downloaded manifest+bundle pair into the cache and
/// returns the resulting entry record.
pub async fn write_entry(
    cache_dir: &Path,
    name: &str,
    version: &str,
    manifest_bytes: &[u8],
    bundle_bytes: &[u8],
    ttl_secs: u64,
) -> Result<LocalCacheEntry, ResolverError> {
    let dir = entry_dir(cache_dir, name, version);
    let manifest_path = dir.join("manifest.yaml");
    let bundle_path = dir.join("bundle.tar.gz");

    write_atomic(&manifest_path, manifest_bytes).await?;
    write_atomic(&bundle_path, bundle_bytes).await?;

    let entry = LocalCacheEntry {
        name: name.to_string(),
        version: version.to_string(),
        cached_at: Utc::now(),
        ttl_secs,
        manifest_path: manifest_path.to_string_lossy().into_owned(),
        bundle_path: bundle_path.to_string_lossy().into_owned(),
    };
    let meta_bytes = serde_json::to_vec_pretty(&entry).expect("LocalCacheEntry always serializes");
    write_atomic(&dir.join("meta.json"), &meta_bytes).await?;
    Ok(entry)
}

/// Removes every expired entry under `cache_dir` and returns the count
/// removed. Corrupt or unreadable meta files count as expired (and are
/// removed) so a damaged cache directory self-heals.
pub async fn cleanup(cache_dir: &Path, now: DateTime<Utc>) -> Result<usize, ResolverError> {
    let mut removed = 0usize;
    let mut names = match fs::read_dir(cache_dir).await {
        Ok(rd) => rd,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(source) => return Err(ResolverError::Io { path: cache_dir.to_path_buf(), source }),
    };

    while let Some(name_dir) =
        names.next_entry().await.map_err(|source| ResolverError::Io { path: cache_dir.to_path_buf(), source })?
    {
        if !name_dir.file_type().await.is_ok_and(|t| t.is_dir()) {
            continue;
        }
        let mut versions = fs::read_dir(name_dir.path())
            .await
            .map_err(|source| ResolverError::Io { path: name_dir.path(), source })?;
        while let Some(version_dir) =
            versions.next_entry().await.map_err(|source| ResolverError::Io { path: name_dir.path(), source })?
        {
            let meta_path = version_dir.path().join("meta.json");
            let expired = match fs::read(&meta_path).await {
                Ok(bytes) => serde_json::from_slice::<LocalCacheEntry>(&bytes)
                    .map(|e| e.is_expired(now))
                    .unwrap_or(true),
                Err(_) => true,
            };
            if expired {
                let _ = fs::remove_dir_all(version_dir.path()).await;
                removed += 1;
            }
        }
    }
    Ok(removed)
}
