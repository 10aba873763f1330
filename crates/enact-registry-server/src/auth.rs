// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bearer-token authentication (§4.F).
//!
//! Open mode (no token map configured) attributes every write to a synthetic
//! admin profile; production mode rejects writes without a recognised
//! bearer token.

use crate::api::ApiError;
use crate::AppState;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use enact_error::{EnactError, ErrorCode};
use std::collections::HashMap;
use std::sync::Arc;

/// Profile id attributed to unauthenticated writes in open mode.
pub const ADMIN_PROFILE_ID: &str = "admin";
/// Username attributed to unauthenticated writes in open mode.
pub const ADMIN_USERNAME: &str = "admin";

/// The registry server's authentication configuration.
///
/// `None` runs the server in open mode: every request is attributed to a
/// synthetic admin identity regardless of headers present. `Some` runs in
/// production mode: a bearer token must be present and map to a known
/// identity, or the request is rejected.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    tokens: Option<HashMap<String, Identity>>,
}

impl AuthConfig {
    /// Open mode: no token required, every caller is the admin identity.
    #[must_use]
    pub fn open() -> Self {
        Self { tokens: None }
    }

    /// Production mode: bearer tokens must match an entry in `tokens`.
    #[must_use]
    pub fn with_tokens(tokens: HashMap<String, Identity>) -> Self {
        Self { tokens: Some(tokens) }
    }

    /// `true` if this configuration requires a bearer token.
    #[must_use]
    pub fn requires_token(&self) -> bool {
        self.tokens.is_some()
    }
}

/// A caller's resolved identity: a profile id and the username used for
/// namespace-ownership checks on publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable profile identifier, stored as `owner_profile_id` on tools this
    /// identity publishes.
    pub profile_id: String,
    /// Publisher handle; tools may be published under `<username>` or
    /// `@<username>`.
    pub username: String,
}

impl Identity {
    /// Construct an identity from a profile id and username.
    #[must_use]
    pub fn new(profile_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self { profile_id: profile_id.into(), username: username.into() }
    }

    /// The synthetic identity attributed to writes in open mode.
    #[must_use]
    pub fn admin() -> Self {
        Self::new(ADMIN_PROFILE_ID, ADMIN_USERNAME)
    }

    /// Whether this identity may publish a tool named `name`: the leading
    /// `/`-separated segment must equal this identity's username, with or
    /// without the `@org` prefix.
    #[must_use]
    pub fn owns_namespace(&self, name: &str) -> bool {
        let head = name.split('/').next().unwrap_or(name);
        head == self.username || head == format!("@{}", self.username)
    }
}

/// Resolves a caller's identity from request headers without rejecting the
/// request when no identity can be determined. Used by read endpoints, where
/// an anonymous caller is valid (subject to visibility checks) rather than a
/// hard authentication failure.
#[must_use]
pub fn identity_from_headers(headers: &axum::http::HeaderMap, auth: &AuthConfig) -> Option<Identity> {
    let Some(tokens) = &auth.tokens else {
        return Some(Identity::admin());
    };
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))?;
    tokens.get(token).cloned()
}

impl FromRequestParts<Arc<AppState>> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let Some(tokens) = &state.auth.tokens else {
            return Ok(Identity::admin());
        };

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| EnactError::new(ErrorCode::Unauthorized, "missing bearer token"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| EnactError::new(ErrorCode::Unauthorized, "malformed authorization header"))?;

        tokens
            .get(token)
            .cloned()
            .ok_or_else(|| EnactError::new(ErrorCode::Unauthorized, "unknown bearer token").into())
    }
}
