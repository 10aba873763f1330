// SPDX-License-Identifier: MIT OR Apache-2.0
//! enact-registry-client
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Typed HTTP client for the Enact registry service (§4.G). Wraps every
//! endpoint exposed by `enact-registry-server`, retrying transient network
//! failures with bounded exponential backoff via [`enact_retry`] and never
//! retrying 4xx responses.

use chrono::{DateTime, Utc};
use enact_core::{Attestation, AttestationRole, Visibility};
use enact_error::ErrorCode;
use enact_retry::{retry_async, RetryConfig, RetryError};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hostnames recognised as the managed Enact deployment. Requests against a
/// base URL matching one of these use key-set authentication (an additional
/// identity header per request); everything else uses standard bearer
/// authentication.
const MANAGED_DEPLOYMENT_HOSTS: &[&str] = &["registry.enact.dev"];

/// Name of the header carrying the key-set identity on managed-deployment
/// requests.
const IDENTITY_HEADER: &str = "x-enact-identity";

fn is_managed_deployment(base_url: &str) -> bool {
    reqwest::Url::parse(base_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .is_some_and(|host| MANAGED_DEPLOYMENT_HOSTS.contains(&host.as_str()))
}

/// How the client authenticates itself to the registry.
#[derive(Debug, Clone)]
pub enum ClientAuth {
    /// No credentials sent; the server runs in open mode.
    Open,
    /// Standard `Authorization: Bearer <token>` header.
    Bearer(String),
    /// Managed-deployment key-set auth: an API key plus an identity string
    /// sent as [`IDENTITY_HEADER`].
    KeySet {
        /// API key.
        key: String,
        /// Identity this key is scoped to.
        identity: String,
    },
}

/// Errors raised by [`RegistryClient`] operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP transport failed (connection, TLS, timeout).
    #[error("request to registry failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The registry responded with a well-formed `{error:{...}}` body.
    #[error("registry returned {code:?}: {message}")]
    Api {
        /// Status-mapped error code.
        code: ErrorCode,
        /// Human-readable message from the server.
        message: String,
    },
    /// The registry's response body could not be decoded.
    #[error("failed to decode registry response: {0}")]
    Decode(#[from] serde_json::Error),
    /// The retry budget was exhausted before a request succeeded.
    #[error("retry budget exhausted: {0}")]
    RetryExhausted(String),
}

impl ClientError {
    /// Maps this error onto the shared stable error-code taxonomy.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Api { code, .. } => *code,
            Self::Transport(_) | Self::RetryExhausted(_) => ErrorCode::NetworkError,
            Self::Decode(_) => ErrorCode::Internal,
        }
    }

    fn from_retry(err: RetryError<ClientError>) -> Self {
        match err {
            RetryError::Operation(e) => e,
            RetryError::TimedOut(d) => Self::RetryExhausted(format!("{d:?}")),
        }
    }

    /// `true` for errors worth retrying: transport failures (excluding
    /// malformed requests) and 5xx responses, which [`status_to_code`] maps
    /// onto [`ErrorCode::Internal`]. 4xx responses are never retried.
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => !e.is_builder() && !e.is_request(),
            Self::Api { code, .. } => matches!(code, ErrorCode::Internal),
            Self::Decode(_) | Self::RetryExhausted(_) => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: enact_error::ErrorBody,
}

async fn api_error_from_response(resp: reqwest::Response) -> ClientError {
    let status = resp.status();
    match resp.json::<ErrorEnvelope>().await {
        Ok(envelope) => ClientError::Api { code: envelope.error.code, message: envelope.error.message },
        Err(_) => ClientError::Api { code: status_to_code(status), message: status.to_string() },
    }
}

fn status_to_code(status: StatusCode) -> ErrorCode {
    match status {
        StatusCode::NOT_FOUND => ErrorCode::NotFound,
        StatusCode::CONFLICT => ErrorCode::Conflict,
        StatusCode::UNAUTHORIZED => ErrorCode::Unauthorized,
        StatusCode::FORBIDDEN => ErrorCode::NamespaceMismatch,
        StatusCode::GONE => ErrorCode::VersionYanked,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ErrorCode::BadRequest,
        s if s.is_server_error() => ErrorCode::Internal,
        _ => ErrorCode::Internal,
    }
}

// ---------------------------------------------------------------------------
// Response DTOs (mirror enact-registry-server's wire shapes, kept
// independent so the client doesn't depend on the server crate)
// ---------------------------------------------------------------------------

/// A tool's top-level metadata as returned over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSummary {
    /// Stable identifier.
    pub id: String,
    /// Hierarchical name.
    pub name: String,
    /// Last path segment of `name`.
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
    /// Cumulative download count across all versions.
    pub total_downloads: u64,
    /// When this tool was first registered.
    pub created_at: DateTime<Utc>,
}

/// A single version's summary as embedded in [`ToolDetail`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionSummary {
    /// Semantic version string.
    pub version: String,
    /// Download count for this specific version.
    pub downloads: u64,
    /// Whether this version is currently yanked.
    pub yanked: bool,
    /// Publisher's profile identifier.
    pub published_by: String,
    /// When this version was published.
    pub published_at: DateTime<Utc>,
}

/// Response of `GET /tools/:name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDetail {
    /// Top-level tool metadata.
    #[serde(flatten)]
    pub tool: ToolSummary,
    /// Every published version, most recent first.
    pub versions: Vec<VersionSummary>,
    /// Latest non-yanked version, if any.
    pub latest: Option<String>,
}

/// Response of `GET /tools/search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Matching tools, already paginated.
    pub tools: Vec<ToolSummary>,
    /// Total matches before pagination.
    pub total: u64,
    /// Echoed page size.
    pub limit: u32,
    /// Echoed page offset.
    pub offset: u32,
    /// `"text"` or `"browse"`, depending on whether `q` was non-empty.
    pub search_type: String,
}

/// Response of `GET /tools/:name/versions/:version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionDetail {
    /// Owning tool's identifier.
    pub tool_id: String,
    /// Semantic version string.
    pub version: String,
    /// Parsed manifest, as JSON.
    pub manifest: serde_json::Value,
    /// Base64-encoded exact original manifest bytes.
    pub raw_manifest_base64: String,
    /// `sha256:<hex>` of the uncompressed bundle archive.
    pub bundle_hash: String,
    /// Size in bytes of the uncompressed bundle archive.
    pub bundle_size: u64,
    /// Download count for this version.
    pub downloads: u64,
    /// Whether this version is currently yanked.
    pub yanked: bool,
    /// Reason given when yanked.
    pub yank_reason: Option<String>,
    /// Suggested replacement version, if any.
    pub replacement: Option<String>,
    /// Publisher's profile identifier.
    pub published_by: String,
    /// When this version was published.
    pub published_at: DateTime<Utc>,
    /// Attestations attached to this version.
    pub attestations: Vec<Attestation>,
}

/// Response of `POST /tools/:name/versions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResponse {
    /// Owning tool's identifier.
    pub tool_id: String,
    /// Published version string.
    pub version: String,
    /// `sha256:<hex>` of the uncompressed bundle archive.
    pub bundle_hash: String,
    /// Size in bytes of the uncompressed bundle archive.
    pub bundle_size: u64,
}

/// Request body for [`RegistryClient::attach_attestation`].
#[derive(Debug, Clone, Serialize)]
pub struct AttestationRequest {
    /// Identity string, e.g. `"github:alice"`.
    pub auditor: String,
    /// Identity provider, e.g. `"github"`.
    pub auditor_provider: String,
    /// Role this attestation was signed under.
    pub role: AttestationRole,
    /// Opaque signing-service envelope.
    pub bundle: serde_json::Value,
    /// Transparency-log entry identifier.
    pub rekor_log_id: Option<String>,
    /// Transparency-log entry index.
    pub rekor_log_index: Option<u64>,
    /// Timestamp the envelope claims to have been signed at.
    pub signed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Typed wrapper over the registry HTTP API.
pub struct RegistryClient {
    http: reqwest::Client,
    base_url: String,
    auth: ClientAuth,
    retry: RetryConfig,
}

impl fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryClient").field("base_url", &self.base_url).finish_non_exhaustive()
    }
}

impl RegistryClient {
    /// Constructs a client against `base_url`, authenticating per `auth`.
    ///
    /// Uses [`RetryConfig::default`] for transient-failure retries. Managed
    /// deployments (see [`MANAGED_DEPLOYMENT_HOSTS`]) are detected from
    /// `base_url` regardless of which [`ClientAuth`] variant is passed —
    /// callers should still pass [`ClientAuth::KeySet`] for those hosts.
    #[must_use]
    pub fn new(base_url: impl Into<String>, auth: ClientAuth) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into(), auth, retry: RetryConfig::default() }
    }

    /// Overrides the default retry policy.
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// `true` if `base_url` matches a known managed deployment.
    #[must_use]
    pub fn is_managed(&self) -> bool {
        is_managed_deployment(&self.base_url)
    }

    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            ClientAuth::Open => req,
            ClientAuth::Bearer(token) => req.bearer_auth(token),
            ClientAuth::KeySet { key, identity } => req.bearer_auth(key).header(IDENTITY_HEADER, identity),
        }
    }

    async fn run<T, F, Fut>(&self, op: F) -> Result<T, ClientError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, ClientError>>,
    {
        retry_async(&self.retry, op, ClientError::is_retryable).await.map(|o| o.value).map_err(ClientError::from_retry)
    }

    /// `GET /tools/search`.
    pub async fn search(&self, q: &str, tags: &[String], limit: u32, offset: u32) -> Result<SearchResponse, ClientError> {
        self.run(|| async {
            let mut req = self.http.get(format!("{}/tools/search", self.base_url)).query(&[
                ("q", q.to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ]);
            if !tags.is_empty() {
                req = req.query(&[("tags", tags.join(","))]);
            }
            let resp = self.apply_auth(req).send().await?;
            if !resp.status().is_success() {
                return Err(api_error_from_response(resp).await);
            }
            Ok(resp.json().await?)
        })
        .await
    }

    /// `GET /tools/:name`.
    pub async fn get_tool(&self, name: &str) -> Result<ToolDetail, ClientError> {
        self.run(|| async {
            let req = self.http.get(format!("{}/tools/{}", self.base_url, urlencode(name)));
            let resp = self.apply_auth(req).send().await?;
            if !resp.status().is_success() {
                return Err(api_error_from_response(resp).await);
            }
            Ok(resp.json().await?)
        })
        .await
    }

    /// `GET /tools/:name/versions/:version`.
    pub async fn get_version(&self, name: &str, version: &str) -> Result<VersionDetail, ClientError> {
        self.run(|| async {
            let req =
                self.http.get(format!("{}/tools/{}/versions/{}", self.base_url, urlencode(name), urlencode(version)));
            let resp = self.apply_auth(req).send().await?;
            if !resp.status().is_success() {
                return Err(api_error_from_response(resp).await);
            }
            Ok(resp.json().await?)
        })
        .await
    }

    /// `GET /tools/:name/versions/:version/download`.
    pub async fn download(&self, name: &str, version: &str, acknowledge_yanked: bool) -> Result<Vec<u8>, ClientError> {
        self.run(|| async {
            let mut req = self.http.get(format!(
                "{}/tools/{}/versions/{}/download",
                self.base_url,
                urlencode(name),
                urlencode(version)
            ));
            if acknowledge_yanked {
                req = req.query(&[("acknowledge_yanked", "true")]);
            }
            let resp = self.apply_auth(req).send().await?;
            if !resp.status().is_success() {
                return Err(api_error_from_response(resp).await);
            }
            Ok(resp.bytes().await?.to_vec())
        })
        .await
    }

    /// `POST /tools/:name/versions` (multipart publish). Not retried: a
    /// partially-uploaded bundle on a transient failure should surface to
    /// the caller rather than silently re-upload.
    pub async fn publish(
        &self,
        name: &str,
        manifest_bytes: Vec<u8>,
        bundle_bytes: Vec<u8>,
        visibility: Option<&str>,
    ) -> Result<PublishResponse, ClientError> {
        let mut form = reqwest::multipart::Form::new()
            .part("manifest", reqwest::multipart::Part::bytes(manifest_bytes))
            .part("bundle", reqwest::multipart::Part::bytes(bundle_bytes));
        if let Some(v) = visibility {
            form = form.text("visibility", v.to_string());
        }

        let req = self.http.post(format!("{}/tools/{}/versions", self.base_url, urlencode(name))).multipart(form);
        let resp = self.apply_auth(req).send().await?;
        if !resp.status().is_success() {
            return Err(api_error_from_response(resp).await);
        }
        Ok(resp.json().await?)
    }

    /// `POST /tools/:name/versions/:version/attestations`.
    pub async fn attach_attestation(
        &self,
        name: &str,
        version: &str,
        request: &AttestationRequest,
    ) -> Result<Attestation, ClientError> {
        self.run(|| async {
            let req = self
                .http
                .post(format!(
                    "{}/tools/{}/versions/{}/attestations",
                    self.base_url,
                    urlencode(name),
                    urlencode(version)
                ))
                .json(request);
            let resp = self.apply_auth(req).send().await?;
            if !resp.status().is_success() {
                return Err(api_error_from_response(resp).await);
            }
            Ok(resp.json().await?)
        })
        .await
    }

    /// `GET /tools/:name/versions/:version/attestations`.
    pub async fn list_attestations(&self, name: &str, version: &str) -> Result<Vec<Attestation>, ClientError> {
        self.run(|| async {
            let req = self.http.get(format!(
                "{}/tools/{}/versions/{}/attestations",
                self.base_url,
                urlencode(name),
                urlencode(version)
            ));
            let resp = self.apply_auth(req).send().await?;
            if !resp.status().is_success() {
                return Err(api_error_from_response(resp).await);
            }
            Ok(resp.json().await?)
        })
        .await
    }

    /// `POST /tools/:name/versions/:version/yank`.
    pub async fn yank(&self, name: &str, version: &str, reason: &str, replacement: Option<&str>) -> Result<(), ClientError> {
        #[derive(Serialize)]
        struct Body<'a> {
            reason: &'a str,
            replacement: Option<&'a str>,
        }
        self.run(|| async {
            let req = self
                .http
                .post(format!("{}/tools/{}/versions/{}/yank", self.base_url, urlencode(name), urlencode(version)))
                .json(&Body { reason, replacement });
            let resp = self.apply_auth(req).send().await?;
            if !resp.status().is_success() {
                return Err(api_error_from_response(resp).await);
            }
            Ok(())
        })
        .await
    }

    /// `POST /tools/:name/versions/:version/unyank`.
    pub async fn unyank(&self, name: &str, version: &str) -> Result<(), ClientError> {
        self.run(|| async {
            let req = self
                .http
                .post(format!("{}/tools/{}/versions/{}/unyank", self.base_url, urlencode(name), urlencode(version)));
            let resp = self.apply_auth(req).send().await?;
            if !resp.status().is_success() {
                return Err(api_error_from_response(resp).await);
            }
            Ok(())
        })
        .await
    }

    /// `PATCH /tools/:name/visibility`.
    pub async fn set_visibility(&self, name: &str, visibility: &str) -> Result<(), ClientError> {
        #[derive(Serialize)]
        struct Body<'a> {
            visibility: &'a str,
        }
        self.run(|| async {
            let req = self
                .http
                .patch(format!("{}/tools/{}/visibility", self.base_url, urlencode(name)))
                .json(&Body { visibility });
            let resp = self.apply_auth(req).send().await?;
            if !resp.status().is_success() {
                return Err(api_error_from_response(resp).await);
            }
            Ok(())
        })
        .await
    }

    /// `DELETE /tools/:name`. Not retried: this is not idempotent in its
    /// error behavior (a retried delete on an already-deleted tool would
    /// surface a spurious `NOT_FOUND`).
    pub async fn delete_tool(&self, name: &str) -> Result<(), ClientError> {
        let req = self.http.delete(format!("{}/tools/{}", self.base_url, urlencode(name)));
        let resp = self.apply_auth(req).send().await?;
        if !resp.status().is_success() {
            return Err(api_error_from_response(resp).await);
        }
        Ok(())
    }
}

/// Percent-encodes a tool name (which may itself contain `/`) so it travels
/// as a single path segment, matching the server's expectation that `{name}`
/// routes receive one percent-encoded segment rather than a wildcard match.
fn urlencode(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
