// SPDX-License-Identifier: MIT OR Apache-2.0
//! enact-registry-store
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Transactional storage for the registry service (§4.E): SQLite tables for
//! profiles, organizations, tools, tool versions, and attestations, a
//! full-text index over `(name, short_name, description, tags)` kept in
//! sync via triggers, and a content-addressed filesystem blob store for
//! bundle archives.

mod blob;
mod schema;

pub use blob::BlobStore;

use chrono::{DateTime, Utc};
use enact_core::{Attestation, AttestationRole, Visibility};
use enact_error::ErrorCode;
use sqlx::error::DatabaseError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

/// Errors raised by registry storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying SQLite driver reported an error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// A filesystem operation on the blob store failed.
    #[error("blob store I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Requested entity does not exist.
    #[error("{0} not found")]
    NotFound(String),
    /// A uniqueness constraint would be violated.
    #[error("{0}")]
    Conflict(String),
    /// The caller does not own the target namespace.
    #[error("{0}")]
    NamespaceMismatch(String),
}

impl StoreError {
    /// Maps this error onto the shared stable error-code taxonomy.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Conflict(_) => ErrorCode::Conflict,
            Self::NamespaceMismatch(_) => ErrorCode::NamespaceMismatch,
            Self::Database(_) | Self::Io(_) => ErrorCode::Internal,
        }
    }
}

/// A tool's top-level metadata row (owns zero or more [`enact_core::VersionRecord`]s).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolRecord {
    /// Stable identifier (UUID-hex).
    pub id: String,
    /// Hierarchical name, unique across the registry.
    pub name: String,
    /// Last path segment of `name`, indexed separately for search.
    pub short_name: String,
    /// One-line summary.
    pub description: Option<String>,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Visibility tier.
    pub visibility: Visibility,
    /// Owning profile, if published under a personal namespace.
    pub owner_profile_id: Option<String>,
    /// Owning organization, if published under an `@org` namespace.
    pub owner_org_id: Option<String>,
    /// Sum of every version's download counter.
    pub total_downloads: u64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Fields required to register a new tool.
#[derive(Debug, Clone)]
pub struct NewTool {
    /// Hierarchical name.
    pub name: String,
    /// One-line summary.
    pub description: Option<String>,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Visibility tier at creation.
    pub visibility: Visibility,
    /// Owning profile, if any.
    pub owner_profile_id: Option<String>,
    /// Owning organization, if any.
    pub owner_org_id: Option<String>,
}

/// Fields required to publish a new version of an existing tool.
#[derive(Debug, Clone)]
pub struct NewVersion {
    /// Semantic version string.
    pub version: String,
    /// Exact original manifest bytes as uploaded.
    pub raw_manifest: Vec<u8>,
    /// `sha256:<hex>` of the uncompressed bundle archive.
    pub bundle_hash: String,
    /// Size in bytes of the uncompressed bundle archive.
    pub bundle_size: u64,
    /// Content-addressed path under the blob store root.
    pub bundle_path: String,
    /// Publisher's profile identifier.
    pub published_by: String,
}

/// Search parameters for `GET /tools/search`.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Free-text query; empty means browse-by-popularity.
    pub q: String,
    /// Every returned tool's tags must be a superset of this list.
    pub tags: Vec<String>,
    /// Page size.
    pub limit: u32,
    /// Page offset.
    pub offset: u32,
}

/// How a [`SearchQuery`] was actually satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    /// `q` was non-empty; the FTS index was used.
    Text,
    /// `q` was empty; results are ordered by total downloads.
    Browse,
}

/// Result page for `GET /tools/search`.
#[derive(Debug, Clone)]
pub struct SearchResults {
    /// Matching tools, already paginated.
    pub tools: Vec<ToolRecord>,
    /// Total matches before pagination.
    pub total: u64,
    /// Echoed page size.
    pub limit: u32,
    /// Echoed page offset.
    pub offset: u32,
    /// Which strategy produced `tools`.
    pub search_type: SearchType,
}

fn short_name_of(name: &str) -> String {
    name.rsplit('/').next().unwrap_or(name).to_string()
}

fn tags_to_db(tags: &[String]) -> String {
    tags.join(",")
}

fn tags_from_db(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        Vec::new()
    } else {
        raw.split(',').map(str::to_string).collect()
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))
}

fn tool_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ToolRecord, StoreError> {
    let visibility_raw: String = row.try_get("visibility")?;
    let visibility = match visibility_raw.as_str() {
        "public" => Visibility::Public,
        "unlisted" => Visibility::Unlisted,
        "private" => Visibility::Private,
        other => {
            return Err(StoreError::Database(sqlx::Error::Decode(
                format!("unknown visibility {other:?}").into(),
            )));
        }
    };
    let created_at: String = row.try_get("created_at")?;
    Ok(ToolRecord {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        short_name: row.try_get("short_name")?,
        description: row.try_get("description")?,
        tags: tags_from_db(&row.try_get::<String, _>("tags")?),
        visibility,
        owner_profile_id: row.try_get("owner_profile_id")?,
        owner_org_id: row.try_get("owner_org_id")?,
        total_downloads: row.try_get::<i64, _>("total_downloads")? as u64,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn version_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<enact_core::VersionRecord, StoreError> {
    let published_at: String = row.try_get("published_at")?;
    Ok(enact_core::VersionRecord {
        tool_id: row.try_get("tool_id")?,
        version: row.try_get("version")?,
        raw_manifest: row.try_get("raw_manifest")?,
        bundle_hash: row.try_get("bundle_hash")?,
        bundle_size: row.try_get::<i64, _>("bundle_size")? as u64,
        bundle_path: row.try_get("bundle_path")?,
        downloads: row.try_get::<i64, _>("downloads")? as u64,
        yanked: row.try_get::<i64, _>("yanked")? != 0,
        yank_reason: row.try_get("yank_reason")?,
        replacement: row.try_get("replacement")?,
        published_by: row.try_get("published_by")?,
        published_at: parse_timestamp(&published_at)?,
    })
}

fn role_to_db(role: AttestationRole) -> &'static str {
    match role {
        AttestationRole::Author => "author",
        AttestationRole::Reviewer => "reviewer",
        AttestationRole::Approver => "approver",
    }
}

fn role_from_db(raw: &str) -> Result<AttestationRole, StoreError> {
    match raw {
        "author" => Ok(AttestationRole::Author),
        "reviewer" => Ok(AttestationRole::Reviewer),
        "approver" => Ok(AttestationRole::Approver),
        other => Err(StoreError::Database(sqlx::Error::Decode(
            format!("unknown attestation role {other:?}").into(),
        ))),
    }
}

fn attestation_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Attestation, StoreError> {
    let signed_at: String = row.try_get("signed_at")?;
    let bundle_raw: String = row.try_get("bundle")?;
    let verified_at: Option<String> = row.try_get("verified_at")?;
    Ok(Attestation {
        tool_version_id: format!("{}@{}", row.try_get::<String, _>("tool_id")?, row.try_get::<String, _>("version")?),
        auditor: row.try_get("auditor")?,
        auditor_provider: row.try_get("auditor_provider")?,
        role: role_from_db(&row.try_get::<String, _>("role")?)?,
        bundle: serde_json::from_str(&bundle_raw)
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?,
        rekor_log_id: row.try_get("rekor_log_id")?,
        rekor_log_index: row.try_get::<Option<i64>, _>("rekor_log_index")?.map(|v| v as u64),
        signed_at: parse_timestamp(&signed_at)?,
        verified: row.try_get::<i64, _>("verified")? != 0,
        rekor_verified: row.try_get::<i64, _>("rekor_verified")? != 0,
        certificate_verified: row.try_get::<i64, _>("certificate_verified")? != 0,
        signature_verified: row.try_get::<i64, _>("signature_verified")? != 0,
        verified_at: verified_at.map(|s| parse_timestamp(&s)).transpose()?,
        revoked: row.try_get::<i64, _>("revoked")? != 0,
    })
}

/// Handle to the registry's SQLite-backed storage.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    pool: SqlitePool,
}

impl RegistryStore {
    /// Connects to `database_url` (e.g. `sqlite://registry.db` or
    /// `sqlite::memory:`), creating the database file if it does not exist,
    /// and applies the schema idempotently.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // A single `:memory:` database only exists for the lifetime of one
        // connection, so an in-memory pool must be capped at one connection
        // or later queries would silently land on a fresh, empty database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 8 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        sqlx::query(schema::SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Wraps an already-open pool, applying the schema idempotently. Mainly
    /// useful for in-memory pools shared across test connections.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(schema::SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    // -- tools --------------------------------------------------------

    /// Registers a new tool. Errors with [`StoreError::Conflict`] if the
    /// name is already taken.
    pub async fn create_tool(&self, new: NewTool) -> Result<ToolRecord, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let short_name = short_name_of(&new.name);
        let created_at = Utc::now();
        let visibility = match new.visibility {
            Visibility::Public => "public",
            Visibility::Unlisted => "unlisted",
            Visibility::Private => "private",
        };

        let result = sqlx::query(
            "INSERT INTO tools (id, name, short_name, description, tags, visibility, owner_profile_id, owner_org_id, total_downloads, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(&id)
        .bind(&new.name)
        .bind(&short_name)
        .bind(&new.description)
        .bind(tags_to_db(&new.tags))
        .bind(visibility)
        .bind(&new.owner_profile_id)
        .bind(&new.owner_org_id)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(ToolRecord {
                id,
                name: new.name,
                short_name,
                description: new.description,
                tags: new.tags,
                visibility: new.visibility,
                owner_profile_id: new.owner_profile_id,
                owner_org_id: new.owner_org_id,
                total_downloads: 0,
                created_at,
            }),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::Conflict(format!("tool {:?} already exists", new.name)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetches a tool by its exact name.
    pub async fn get_tool_by_name(&self, name: &str) -> Result<ToolRecord, StoreError> {
        let row = sqlx::query("SELECT * FROM tools WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("tool {name:?}")))?;
        tool_from_row(&row)
    }

    /// Searches or browses tools per §4.F. `q` empty browses by
    /// `total_downloads DESC`; otherwise each whitespace-separated term is
    /// matched as an FTS prefix. Results are always filtered to public
    /// visibility and then by tag superset.
    pub async fn search_tools(&self, query: &SearchQuery) -> Result<SearchResults, StoreError> {
        let limit = query.limit.max(1) as i64;
        let offset = query.offset as i64;

        let mut candidates: Vec<ToolRecord> = if query.q.trim().is_empty() {
            let rows = sqlx::query(
                "SELECT * FROM tools WHERE visibility = 'public' ORDER BY total_downloads DESC",
            )
            .fetch_all(&self.pool)
            .await?;
            rows.iter().map(tool_from_row).collect::<Result<_, _>>()?
        } else {
            let match_expr = query
                .q
                .split_whitespace()
                .map(|term| format!("{}*", fts_escape(term)))
                .collect::<Vec<_>>()
                .join(" ");
            let rows = sqlx::query(
                "SELECT tools.* FROM tools
                 JOIN tools_fts ON tools.rowid = tools_fts.rowid
                 WHERE tools_fts MATCH ? AND tools.visibility = 'public'
                 ORDER BY rank",
            )
            .bind(match_expr)
            .fetch_all(&self.pool)
            .await?;
            rows.iter().map(tool_from_row).collect::<Result<_, _>>()?
        };

        if !query.tags.is_empty() {
            candidates.retain(|t| query.tags.iter().all(|tag| t.tags.contains(tag)));
        }

        let total = candidates.len() as u64;
        let page = candidates
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        Ok(SearchResults {
            tools: page,
            total,
            limit: limit as u32,
            offset: offset as u32,
            search_type: if query.q.trim().is_empty() { SearchType::Browse } else { SearchType::Text },
        })
    }

    /// Changes a tool's visibility tier.
    pub async fn set_visibility(&self, name: &str, visibility: Visibility) -> Result<(), StoreError> {
        let raw = match visibility {
            Visibility::Public => "public",
            Visibility::Unlisted => "unlisted",
            Visibility::Private => "private",
        };
        let result = sqlx::query("UPDATE tools SET visibility = ? WHERE name = ?")
            .bind(raw)
            .bind(name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("tool {name:?}")));
        }
        Ok(())
    }

    /// Deletes a tool and, via `ON DELETE CASCADE`, every version,
    /// attestation, and download-log row beneath it. Does not touch blob
    /// files; callers should pair this with [`BlobStore::delete_tool_blobs`].
    pub async fn delete_tool(&self, name: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM tools WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("tool {name:?}")));
        }
        Ok(())
    }

    // -- versions -------------------------------------------------------

    /// Publishes a new version under `tool_id`. Errors with
    /// [`StoreError::Conflict`] if `(tool_id, version)` already exists.
    pub async fn publish_version(
        &self,
        tool_id: &str,
        new: NewVersion,
    ) -> Result<enact_core::VersionRecord, StoreError> {
        let published_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO tool_versions (tool_id, version, raw_manifest, bundle_hash, bundle_size, bundle_path, downloads, yanked, published_by, published_at)
             VALUES (?, ?, ?, ?, ?, ?, 0, 0, ?, ?)",
        )
        .bind(tool_id)
        .bind(&new.version)
        .bind(&new.raw_manifest)
        .bind(&new.bundle_hash)
        .bind(new.bundle_size as i64)
        .bind(&new.bundle_path)
        .bind(&new.published_by)
        .bind(published_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(enact_core::VersionRecord {
                tool_id: tool_id.to_string(),
                version: new.version,
                raw_manifest: new.raw_manifest,
                bundle_hash: new.bundle_hash,
                bundle_size: new.bundle_size,
                bundle_path: new.bundle_path,
                downloads: 0,
                yanked: false,
                yank_reason: None,
                replacement: None,
                published_by: new.published_by,
                published_at,
            }),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(StoreError::Conflict(format!(
                "version {:?} already exists for this tool",
                new.version
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetches a single version's full record by tool name and version.
    pub async fn get_version(&self, name: &str, version: &str) -> Result<enact_core::VersionRecord, StoreError> {
        let tool = self.get_tool_by_name(name).await?;
        let row = sqlx::query("SELECT * FROM tool_versions WHERE tool_id = ? AND version = ?")
            .bind(&tool.id)
            .bind(version)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("version {name}@{version}")))?;
        version_from_row(&row)
    }

    /// Lists every version of a tool, most recently published first.
    pub async fn list_versions(&self, tool_id: &str) -> Result<Vec<enact_core::VersionRecord>, StoreError> {
        let rows = sqlx::query("SELECT * FROM tool_versions WHERE tool_id = ? ORDER BY published_at DESC")
            .bind(tool_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(version_from_row).collect()
    }

    /// Marks a version yanked with `reason` and optional `replacement`.
    pub async fn yank_version(
        &self,
        tool_id: &str,
        version: &str,
        reason: &str,
        replacement: Option<&str>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE tool_versions SET yanked = 1, yank_reason = ?, replacement = ? WHERE tool_id = ? AND version = ?",
        )
        .bind(reason)
        .bind(replacement)
        .bind(tool_id)
        .bind(version)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("version {tool_id}@{version}")));
        }
        Ok(())
    }

    /// Reverses a yank, clearing reason and replacement.
    pub async fn unyank_version(&self, tool_id: &str, version: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE tool_versions SET yanked = 0, yank_reason = NULL, replacement = NULL WHERE tool_id = ? AND version = ?",
        )
        .bind(tool_id)
        .bind(version)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("version {tool_id}@{version}")));
        }
        Ok(())
    }

    /// Records a successful download: increments the per-version and
    /// per-tool counters and appends a download-log row.
    pub async fn record_download(&self, tool_id: &str, version: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE tool_versions SET downloads = downloads + 1 WHERE tool_id = ? AND version = ?")
            .bind(tool_id)
            .bind(version)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE tools SET total_downloads = total_downloads + 1 WHERE id = ?")
            .bind(tool_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO download_logs (tool_id, version, downloaded_at) VALUES (?, ?, ?)")
            .bind(tool_id)
            .bind(version)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    // -- attestations -----------------------------------------------------

    /// Stores a new attestation against `(tool_id, version)`.
    pub async fn insert_attestation(
        &self,
        tool_id: &str,
        version: &str,
        attestation: Attestation,
    ) -> Result<Attestation, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let bundle_raw = serde_json::to_string(&attestation.bundle)
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?;
        sqlx::query(
            "INSERT INTO attestations (id, tool_id, version, auditor, auditor_provider, role, bundle, rekor_log_id, rekor_log_index, signed_at, verified, rekor_verified, certificate_verified, signature_verified, verified_at, revoked)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(tool_id)
        .bind(version)
        .bind(&attestation.auditor)
        .bind(&attestation.auditor_provider)
        .bind(role_to_db(attestation.role))
        .bind(bundle_raw)
        .bind(&attestation.rekor_log_id)
        .bind(attestation.rekor_log_index.map(|v| v as i64))
        .bind(attestation.signed_at.to_rfc3339())
        .bind(attestation.verified as i64)
        .bind(attestation.rekor_verified as i64)
        .bind(attestation.certificate_verified as i64)
        .bind(attestation.signature_verified as i64)
        .bind(attestation.verified_at.map(|t| t.to_rfc3339()))
        .bind(attestation.revoked as i64)
        .execute(&self.pool)
        .await?;
        Ok(attestation)
    }

    /// Lists attestations for `(tool_id, version)`, most recent first.
    /// Revoked entries are included only when `include_revoked` is set.
    pub async fn list_attestations(
        &self,
        tool_id: &str,
        version: &str,
        include_revoked: bool,
    ) -> Result<Vec<Attestation>, StoreError> {
        let rows = if include_revoked {
            sqlx::query("SELECT * FROM attestations WHERE tool_id = ? AND version = ? ORDER BY signed_at DESC")
                .bind(tool_id)
                .bind(version)
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query(
                "SELECT * FROM attestations WHERE tool_id = ? AND version = ? AND revoked = 0 ORDER BY signed_at DESC",
            )
            .bind(tool_id)
            .bind(version)
            .fetch_all(&self.pool)
            .await?
        };
        rows.iter().map(attestation_from_row).collect()
    }
}

fn fts_escape(term: &str) -> String {
    term.chars().filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_').collect()
}
