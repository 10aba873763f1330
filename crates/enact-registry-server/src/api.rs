// SPDX-License-Identifier: MIT OR Apache-2.0
//! HTTP handlers for the registry service (§4.F).

use crate::auth::{identity_from_headers, Identity};
use crate::validation::RequestValidator;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use enact_attest::{verify_attestation, Attestation, AttestationRole, PermissiveCertificateVerifier, PermissiveSignatureVerifier, PresenceRekorVerifier, Verifiers};
use enact_core::{sha256_prefixed, Visibility};
use enact_error::{EnactError, ErrorBody, ErrorCode};
use enact_registry_store::{NewTool, NewVersion, SearchQuery as StoreSearchQuery, StoreError, ToolRecord};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Unified HTTP error response, reusing [`enact_error`]'s
/// `{error:{code, message, details?}}` wire shape.
#[derive(Debug)]
pub struct ApiError(pub EnactError);

impl From<EnactError> for ApiError {
    fn from(e: EnactError) -> Self {
        Self(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        let code = e.code();
        Self(EnactError::new(code, e.to_string()))
    }
}

impl From<enact_manifest::ManifestError> for ApiError {
    fn from(e: enact_manifest::ManifestError) -> Self {
        let code = e.code();
        Self(EnactError::new(code, e.to_string()))
    }
}

impl ApiError {
    /// Shorthand for constructing a `VALIDATION_ERROR` with accumulated
    /// field-level messages attached as `details.errors`.
    #[must_use]
    pub fn validation(errors: Vec<String>) -> Self {
        Self(EnactError::new(ErrorCode::ValidationError, "request failed validation").with_context("errors", errors))
    }

    /// Shorthand for `BAD_REQUEST`.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(EnactError::new(ErrorCode::BadRequest, message))
    }

    fn status_code(&self) -> StatusCode {
        match self.0.code {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::NamespaceMismatch => StatusCode::FORBIDDEN,
            ErrorCode::ValidationError | ErrorCode::BadRequest | ErrorCode::InvalidName | ErrorCode::InvalidVersion | ErrorCode::SchemaViolation => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::VersionYanked => StatusCode::GONE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body: ErrorBody = (&self.0).into();
        (status, Json(json!({ "error": body }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "time": Utc::now().to_rfc3339() }))
}

// ---------------------------------------------------------------------------
// GET /tools/search
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    20
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub tools: Vec<ToolRecord>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
    pub search_type: enact_registry_store::SearchType,
}

pub async fn search_tools(State(state): State<Arc<AppState>>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    RequestValidator::validate_search_query(&params.q).map_err(ApiError::bad_request)?;

    let tags = params
        .tags
        .as_deref()
        .map(|s| s.split(',').filter(|t| !t.is_empty()).map(str::to_string).collect())
        .unwrap_or_default();

    let results = state
        .store
        .search_tools(&StoreSearchQuery { q: params.q, tags, limit: params.limit, offset: params.offset })
        .await?;

    Ok(Json(SearchResponse {
        tools: results.tools,
        total: results.total,
        limit: results.limit,
        offset: results.offset,
        search_type: results.search_type,
    }))
}

// ---------------------------------------------------------------------------
// GET /tools/:name
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct VersionSummary {
    pub version: String,
    pub downloads: u64,
    pub yanked: bool,
    pub published_by: String,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ToolDetail {
    #[serde(flatten)]
    pub tool: ToolRecord,
    pub versions: Vec<VersionSummary>,
    pub latest: Option<String>,
}

fn check_visible(tool: &ToolRecord, identity: Option<&Identity>) -> Result<(), ApiError> {
    if tool.visibility != Visibility::Private {
        return Ok(());
    }
    match identity {
        Some(id) if Some(&id.profile_id) == tool.owner_profile_id.as_ref() => Ok(()),
        _ => Err(EnactError::new(ErrorCode::NotFound, format!("tool {:?} not found", tool.name)).into()),
    }
}

pub async fn get_tool(State(state): State<Arc<AppState>>, Path(name): Path<String>, headers: HeaderMap) -> Result<Json<ToolDetail>, ApiError> {
    let tool = state.store.get_tool_by_name(&name).await?;
    let identity = identity_from_headers(&headers, &state.auth);
    check_visible(&tool, identity.as_ref())?;

    let versions = state.store.list_versions(&tool.id).await?;
    let latest = versions.iter().find(|v| !v.yanked).map(|v| v.version.clone());
    let versions = versions
        .into_iter()
        .map(|v| VersionSummary { version: v.version, downloads: v.downloads, yanked: v.yanked, published_by: v.published_by, published_at: v.published_at })
        .collect();

    Ok(Json(ToolDetail { tool, versions, latest }))
}

// ---------------------------------------------------------------------------
// GET /tools/:name/versions/:version
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct VersionDetail {
    pub tool_id: String,
    pub version: String,
    pub manifest: enact_manifest::Manifest,
    pub raw_manifest_base64: String,
    pub bundle_hash: String,
    pub bundle_size: u64,
    pub downloads: u64,
    pub yanked: bool,
    pub yank_reason: Option<String>,
    pub replacement: Option<String>,
    pub published_by: String,
    pub published_at: DateTime<Utc>,
    pub attestations: Vec<Attestation>,
}

pub async fn get_version(
    State(state): State<Arc<AppState>>,
    Path((name, version)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<VersionDetail>, ApiError> {
    let tool = state.store.get_tool_by_name(&name).await?;
    let identity = identity_from_headers(&headers, &state.auth);
    check_visible(&tool, identity.as_ref())?;

    let record = state.store.get_version(&name, &version).await?;
    let (manifest, _) = enact_manifest::parse(&record.raw_manifest)?;
    let attestations = state.store.list_attestations(&tool.id, &version, false).await?;

    Ok(Json(VersionDetail {
        tool_id: record.tool_id,
        version: record.version,
        manifest,
        raw_manifest_base64: base64_encode(&record.raw_manifest),
        bundle_hash: record.bundle_hash,
        bundle_size: record.bundle_size,
        downloads: record.downloads,
        yanked: record.yanked,
        yank_reason: record.yank_reason,
        replacement: record.replacement,
        published_by: record.published_by,
        published_at: record.published_at,
        attestations,
    }))
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

// ---------------------------------------------------------------------------
// GET /tools/:name/versions/:version/download
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    #[serde(default)]
    pub acknowledge_yanked: bool,
}

pub async fn download_version(
    State(state): State<Arc<AppState>>,
    Path((name, version)): Path<(String, String)>,
    Query(params): Query<DownloadParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let tool = state.store.get_tool_by_name(&name).await?;
    let identity = identity_from_headers(&headers, &state.auth);
    check_visible(&tool, identity.as_ref())?;

    let record = state.store.get_version(&name, &version).await?;
    if record.yanked && !params.acknowledge_yanked {
        return Err(EnactError::new(ErrorCode::VersionYanked, "version is yanked")
            .with_context("reason", record.yank_reason.clone().unwrap_or_default())
            .with_context("replacement", record.replacement.clone())
            .into());
    }

    let bytes = state.blobs.read_bundle(&name, &version).await?;
    state.store.record_download(&tool.id, &version).await?;

    Ok((
        StatusCode::OK,
        [("content-type", "application/gzip"), ("etag", &format!("\"{}\"", record.bundle_hash))],
        Bytes::from(bytes),
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// POST /tools/:name/versions (publish)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub tool_id: String,
    pub version: String,
    pub bundle_hash: String,
    pub bundle_size: u64,
}

pub async fn publish_version(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    identity: Identity,
    mut multipart: Multipart,
) -> Result<Json<PublishResponse>, ApiError> {
    let mut manifest_bytes: Option<Vec<u8>> = None;
    let mut raw_manifest_override: Option<Vec<u8>> = None;
    let mut bundle_bytes: Option<Vec<u8>> = None;
    let mut visibility = Visibility::Public;

    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::bad_request(e.to_string()))? {
        match field.name().unwrap_or_default() {
            "manifest" => manifest_bytes = Some(field.bytes().await.map_err(|e| ApiError::bad_request(e.to_string()))?.to_vec()),
            "raw_manifest" => raw_manifest_override = Some(field.bytes().await.map_err(|e| ApiError::bad_request(e.to_string()))?.to_vec()),
            "bundle" => bundle_bytes = Some(field.bytes().await.map_err(|e| ApiError::bad_request(e.to_string()))?.to_vec()),
            "visibility" => {
                let raw = field.text().await.map_err(|e| ApiError::bad_request(e.to_string()))?;
                visibility = RequestValidator::validate_visibility(&raw).map_err(ApiError::bad_request)?;
            }
            _ => {}
        }
    }

    let manifest_bytes = manifest_bytes.ok_or_else(|| ApiError::bad_request("missing multipart field \"manifest\""))?;
    let bundle_bytes = bundle_bytes.ok_or_else(|| ApiError::bad_request("missing multipart field \"bundle\""))?;
    RequestValidator::validate_publish(&manifest_bytes, &bundle_bytes).map_err(ApiError::validation)?;

    let raw_manifest = raw_manifest_override.unwrap_or_else(|| manifest_bytes.clone());
    let (manifest, _) = enact_manifest::parse(&manifest_bytes)?;

    if manifest.name != name {
        return Err(ApiError::bad_request(format!("manifest name {:?} does not match path {:?}", manifest.name, name)));
    }
    if !identity.owns_namespace(&name) {
        return Err(EnactError::new(ErrorCode::NamespaceMismatch, format!("{} may not publish under {:?}", identity.username, name)).into());
    }

    let tool = match state.store.get_tool_by_name(&name).await {
        Ok(existing) => {
            if existing.owner_profile_id.as_deref() != Some(identity.profile_id.as_str()) {
                return Err(EnactError::new(ErrorCode::NamespaceMismatch, format!("{:?} is owned by another profile", name)).into());
            }
            existing
        }
        Err(StoreError::NotFound(_)) => {
            state
                .store
                .create_tool(NewTool {
                    name: name.clone(),
                    description: manifest.description.clone(),
                    tags: manifest.tags.clone(),
                    visibility,
                    owner_profile_id: Some(identity.profile_id.clone()),
                    owner_org_id: None,
                })
                .await?
        }
        Err(e) => return Err(e.into()),
    };

    let bundle_hash = sha256_prefixed(&bundle_bytes);
    let bundle_size = bundle_bytes.len() as u64;
    state.blobs.write_bundle(&name, &manifest.version, &bundle_bytes).await?;
    let bundle_path = state.blobs.bundle_path(&name, &manifest.version).to_string_lossy().into_owned();

    let version = state
        .store
        .publish_version(
            &tool.id,
            NewVersion {
                version: manifest.version.clone(),
                raw_manifest,
                bundle_hash: bundle_hash.clone(),
                bundle_size,
                bundle_path,
                published_by: identity.profile_id.clone(),
            },
        )
        .await?;

    Ok(Json(PublishResponse { tool_id: tool.id, version: version.version, bundle_hash, bundle_size }))
}

// ---------------------------------------------------------------------------
// Attestations
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AttestationRequest {
    pub auditor: String,
    pub auditor_provider: String,
    pub role: AttestationRole,
    pub bundle: serde_json::Value,
    #[serde(default)]
    pub rekor_log_id: Option<String>,
    #[serde(default)]
    pub rekor_log_index: Option<u64>,
    pub signed_at: DateTime<Utc>,
}

pub async fn attach_attestation(
    State(state): State<Arc<AppState>>,
    Path((name, version)): Path<(String, String)>,
    _identity: Identity,
    Json(req): Json<AttestationRequest>,
) -> Result<Json<Attestation>, ApiError> {
    let tool = state.store.get_tool_by_name(&name).await?;
    state.store.get_version(&name, &version).await?;

    let attestation = Attestation {
        tool_version_id: format!("{}@{version}", tool.id),
        auditor: req.auditor,
        auditor_provider: req.auditor_provider,
        role: req.role,
        bundle: req.bundle,
        rekor_log_id: req.rekor_log_id,
        rekor_log_index: req.rekor_log_index,
        signed_at: req.signed_at,
        verified: false,
        rekor_verified: false,
        certificate_verified: false,
        signature_verified: false,
        verified_at: None,
        revoked: false,
    };

    let cert = PermissiveCertificateVerifier;
    let sig = PermissiveSignatureVerifier;
    let rekor = PresenceRekorVerifier;
    let verified = verify_attestation(&attestation, &Verifiers { certificate: &cert, signature: &sig, rekor: &rekor });

    let stored = state.store.insert_attestation(&tool.id, &version, verified).await?;
    Ok(Json(stored))
}

pub async fn list_attestations(
    State(state): State<Arc<AppState>>,
    Path((name, version)): Path<(String, String)>,
) -> Result<Json<Vec<Attestation>>, ApiError> {
    let tool = state.store.get_tool_by_name(&name).await?;
    let attestations = state.store.list_attestations(&tool.id, &version, false).await?;
    Ok(Json(attestations))
}

// ---------------------------------------------------------------------------
// Yank / unyank
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct YankRequest {
    pub reason: String,
    #[serde(default)]
    pub replacement: Option<String>,
}

pub async fn yank_version(
    State(state): State<Arc<AppState>>,
    Path((name, version)): Path<(String, String)>,
    identity: Identity,
    Json(req): Json<YankRequest>,
) -> Result<StatusCode, ApiError> {
    RequestValidator::validate_yank_reason(&req.reason).map_err(ApiError::bad_request)?;
    let tool = require_ownership(&state, &name, &identity).await?;
    state.store.yank_version(&tool.id, &version, &req.reason, req.replacement.as_deref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unyank_version(
    State(state): State<Arc<AppState>>,
    Path((name, version)): Path<(String, String)>,
    identity: Identity,
) -> Result<StatusCode, ApiError> {
    let tool = require_ownership(&state, &name, &identity).await?;
    state.store.unyank_version(&tool.id, &version).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// PATCH /tools/:name/visibility
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub visibility: String,
}

pub async fn set_visibility(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    identity: Identity,
    Json(req): Json<VisibilityRequest>,
) -> Result<StatusCode, ApiError> {
    let visibility = RequestValidator::validate_visibility(&req.visibility).map_err(ApiError::bad_request)?;
    require_ownership(&state, &name, &identity).await?;
    state.store.set_visibility(&name, visibility).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// DELETE /tools/:name
// ---------------------------------------------------------------------------

pub async fn delete_tool(State(state): State<Arc<AppState>>, Path(name): Path<String>, identity: Identity) -> Result<StatusCode, ApiError> {
    require_ownership(&state, &name, &identity).await?;
    state.store.delete_tool(&name).await?;
    state.blobs.delete_tool_blobs(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn require_ownership(state: &AppState, name: &str, identity: &Identity) -> Result<ToolRecord, ApiError> {
    let tool = state.store.get_tool_by_name(name).await?;
    if tool.owner_profile_id.as_deref() != Some(identity.profile_id.as_str()) {
        return Err(EnactError::new(ErrorCode::NamespaceMismatch, format!("{name:?} is owned by another profile")).into());
    }
    Ok(tool)
}
