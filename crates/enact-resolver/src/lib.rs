// SPDX-License-Identifier: MIT OR Apache-2.0
//! enact-resolver
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Resolves a skill name to a usable manifest+bundle pair (§4.H), checking
//! three tiers in order — the local tools directory, the on-disk download
//! cache, then the registry — and maintains the small pieces of resolver
//! state that ride alongside: favorites, aliases, and name suggestions.

mod cache;
mod local;
mod state;
mod suggest;

pub use suggest::edit_distance;

use chrono::Utc;
use enact_error::ErrorCode;
use enact_manifest::Manifest;
use enact_registry_client::{ClientError, RegistryClient};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Default time-to-live applied to freshly cached downloads: 24 hours.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Errors raised while resolving, caching, or managing resolver state.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// Neither `HOME` nor `USERPROFILE` is set.
    #[error("could not determine the home directory: set HOME or USERPROFILE")]
    NoHomeDir,
    /// No manifest by this name was found locally, in the cache, or in the
    /// registry.
    #[error("skill not found: {0}")]
    NotFound(String),
    /// A filesystem operation failed.
    #[error("{path}: {source}")]
    Io {
        /// Path the failing operation targeted.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// A cache meta record exists but doesn't parse.
    #[error("corrupt cache record at {0}")]
    CorruptCache(PathBuf),
    /// A cached or downloaded manifest failed to parse.
    #[error(transparent)]
    Manifest(#[from] enact_manifest::ManifestError),
    /// The registry client reported an error while resolving tier 3.
    #[error(transparent)]
    Registry(#[from] ClientError),
}

impl ResolverError {
    /// Maps this error onto the shared stable error-code taxonomy.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NoHomeDir | Self::Io { .. } | Self::CorruptCache(_) => ErrorCode::Internal,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Manifest(e) => e.code(),
            Self::Registry(e) => e.code(),
        }
    }
}

/// Which tier satisfied a [`Resolver::resolve`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveSource {
    /// Found directly under the local tools directory.
    Local,
    /// Served from a fresh entry in the download cache.
    Cache,
    /// Freshly downloaded from the registry and cached for next time.
    Registry,
}

impl std::fmt::Display for ResolveSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Local => "local",
            Self::Cache => "cache",
            Self::Registry => "registry",
        })
    }
}

/// The result of resolving a skill by name.
#[derive(Debug, Clone)]
pub struct ResolvedSkill {
    /// Canonical (alias-expanded) name.
    pub name: String,
    /// Resolved version string.
    pub version: String,
    /// Which tier produced this result.
    pub source: ResolveSource,
    /// Parsed manifest.
    pub manifest: Manifest,
    /// Path to the manifest file on disk.
    pub manifest_path: PathBuf,
    /// Path to the bundle archive, if this coordinate came from the cache
    /// or registry. Local tools-directory matches have no separate bundle
    /// — the directory tree itself is the skill.
    pub bundle_path: Option<PathBuf>,
}

/// Resolves skill names via the local tools directory, the download cache,
/// and the registry, in that order.
pub struct Resolver {
    tools_dir: PathBuf,
    cache_dir: PathBuf,
    state_dir: PathBuf,
    client: RegistryClient,
    cache_ttl_secs: u64,
    // Per-(name, version) single-flight coalescing: concurrent resolves of
    // the same coordinate share one in-flight download. Entries are never
    // evicted; the key space is bounded by the number of distinct
    // coordinates ever requested in the process's lifetime, which for a
    // resolver is small enough not to matter.
    locks: Mutex<HashMap<(String, String), Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("tools_dir", &self.tools_dir)
            .field("cache_dir", &self.cache_dir)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Builds a resolver rooted at `<home_dir>/.enact/`.
    #[must_use]
    pub fn new(home_dir: impl Into<PathBuf>, client: RegistryClient) -> Self {
        let state_dir = home_dir.into().join(".enact");
        Self {
            tools_dir: state_dir.join("tools"),
            cache_dir: state_dir.join("cache"),
            state_dir,
            client,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Builds a resolver rooted at the process's home directory
    /// (`$HOME`, falling back to `%USERPROFILE%`).
    pub fn from_env(client: RegistryClient) -> Result<Self, ResolverError> {
        let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")).ok_or(ResolverError::NoHomeDir)?;
        Ok(Self::new(PathBuf::from(home), client))
    }

    /// Overrides the TTL applied to newly cached downloads.
    #[must_use]
    pub fn with_cache_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.cache_ttl_secs = ttl_secs;
        self
    }

    /// Resolves `name` (or an alias of it) in order: local tools directory,
    /// cache, registry.
    pub async fn resolve(&self, name: &str) -> Result<ResolvedSkill, ResolverError> {
        let canonical = self.resolve_alias(name).await?;

        if let Some(found) = local::find(&self.tools_dir, &canonical)? {
            debug!(name = %canonical, "resolved from local tools directory");
            return Ok(ResolvedSkill {
                name: canonical,
                version: found.manifest.version.clone(),
                source: ResolveSource::Local,
                manifest: found.manifest,
                manifest_path: found.manifest_path,
                bundle_path: None,
            });
        }

        if let Some(entry) = cache::freshest_for_name(&self.cache_dir, &canonical, Utc::now()).await? {
            debug!(name = %canonical, version = %entry.version, "resolved from cache");
            return self.load_cached(canonical, entry, ResolveSource::Cache).await;
        }

        self.resolve_from_registry(canonical).await
    }

    async fn resolve_from_registry(&self, name: String) -> Result<ResolvedSkill, ResolverError> {
        let detail = self.client.get_tool(&name).await?;
        let version = detail.latest.ok_or_else(|| ResolverError::NotFound(name.clone()))?;

        let lock = self.lock_for(&name, &version).await;
        let _guard = lock.lock().await;

        // Another waiter may have populated the cache while we waited.
        if let Some(entry) = cache::read_entry(&self.cache_dir, &name, &version).await? {
            if !entry.is_expired(Utc::now()) {
                return self.load_cached(name, entry, ResolveSource::Cache).await;
            }
        }

        info!(name = %name, version = %version, "downloading from registry");
        let version_detail = self.client.get_version(&name, &version).await?;
        let bundle_bytes = self.client.download(&name, &version, false).await?;

        use base64::Engine;
        let manifest_bytes = base64::engine::general_purpose::STANDARD
            .decode(&version_detail.raw_manifest_base64)
            .map_err(|_| ResolverError::CorruptCache(self.cache_dir.join(cache_entry_label(&name, &version))))?;

        let entry =
            cache::write_entry(&self.cache_dir, &name, &version, &manifest_bytes, &bundle_bytes, self.cache_ttl_secs)
                .await?;
        self.load_cached(name, entry, ResolveSource::Registry).await
    }

    async fn load_cached(
        &self,
        name: String,
        entry: enact_core::LocalCacheEntry,
        source: ResolveSource,
    ) -> Result<ResolvedSkill, ResolverError> {
        let manifest_path = PathBuf::from(&entry.manifest_path);
        let raw = tokio::fs::read(&manifest_path)
            .await
            .map_err(|source_err| ResolverError::Io { path: manifest_path.clone(), source: source_err })?;
        let (manifest, _raw) = enact_manifest::parse(&raw)?;
        Ok(ResolvedSkill {
            name,
            version: entry.version,
            source,
            manifest,
            manifest_path,
            bundle_path: Some(PathBuf::from(entry.bundle_path)),
        })
    }

    async fn lock_for(&self, name: &str, version: &str) -> Arc<Mutex<()>> {
        let key = (name.to_string(), version.to_string());
        let mut locks = self.locks.lock().await;
        locks.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Removes every expired cache entry and returns the count removed.
    pub async fn cleanup_cache(&self) -> Result<usize, ResolverError> {
        cache::cleanup(&self.cache_dir, Utc::now()).await
    }

    /// Adds `name` to the favorites set.
    pub async fn add_favorite(&self, name: &str) -> Result<(), ResolverError> {
        state::add_favorite(&self.state_dir, name).await
    }

    /// Removes `name` from the favorites set.
    pub async fn remove_favorite(&self, name: &str) -> Result<(), ResolverError> {
        state::remove_favorite(&self.state_dir, name).await
    }

    /// Lists favorited tool names.
    pub async fn favorites(&self) -> Result<Vec<String>, ResolverError> {
        state::read_favorites(&self.state_dir).await
    }

    /// Binds `alias` to resolve as `canonical_name`.
    pub async fn set_alias(&self, alias: &str, canonical_name: &str) -> Result<(), ResolverError> {
        state::set_alias(&self.state_dir, alias, canonical_name).await
    }

    /// Removes an alias binding, if present.
    pub async fn remove_alias(&self, alias: &str) -> Result<(), ResolverError> {
        state::remove_alias(&self.state_dir, alias).await
    }

    async fn resolve_alias(&self, name: &str) -> Result<String, ResolverError> {
        let aliases = state::read_aliases(&self.state_dir).await?;
        Ok(aliases.get(name).cloned().unwrap_or_else(|| name.to_string()))
    }

    /// Suggests up to `limit` known names close to `partial`, drawn from
    /// the union of locally present and cached tool names.
    pub fn suggest(&self, partial: &str, limit: usize) -> Vec<String> {
        let mut names = local::all_names(&self.tools_dir);
        names.extend(cached_names(&self.cache_dir));
        names.sort();
        names.dedup();
        suggest::suggest(partial, &names, limit)
    }
}

fn cached_names(cache_dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(cache_dir) else { return Vec::new() };
    entries
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
        .filter_map(|e| e.file_name().into_string().ok())
        .collect()
}

fn cache_entry_label(name: &str, version: &str) -> String {
    format!("{name}/{version}")
}
