// SPDX-License-Identifier: MIT OR Apache-2.0
//! enact-registry-server
#![deny(unsafe_code)]
//!
//! HTTP registry service (§4.F): publish, search, download, yank, and
//! attestation routes over an [`enact_registry_store::RegistryStore`].

pub mod api;
pub mod auth;
pub mod middleware;
pub mod validation;

use auth::AuthConfig;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use enact_ratelimit::RateLimiter;
use enact_registry_store::{BlobStore, RegistryStore};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state handed to every request handler.
pub struct AppState {
    /// SQLite-backed tool/version/attestation storage.
    pub store: RegistryStore,
    /// Content-addressed bundle archive storage.
    pub blobs: BlobStore,
    /// Bearer-token authentication configuration.
    pub auth: AuthConfig,
    /// Sliding-window limiter applied to write routes.
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Constructs state with the default write-route rate limit of 60
    /// requests per minute.
    #[must_use]
    pub fn new(store: RegistryStore, blobs: BlobStore, auth: AuthConfig) -> Self {
        Self { store, blobs, auth, rate_limiter: RateLimiter::new(60, Duration::from_secs(60)) }
    }
}

/// Builds the Axum router with every registry route wired up.
///
/// Rate limiting is applied only to routes that mutate state (publish,
/// attest, yank/unyank, visibility, delete) — read routes are left
/// unlimited since they're the common case for resolvers polling for
/// updates.
#[must_use]
pub fn build_app(state: Arc<AppState>) -> Router {
    let rate_limited = state.rate_limiter.clone().into_layer();

    // Tool names are hierarchical (`alice/hello`, `@acme/hello`) but travel
    // as a single percent-encoded path segment (`alice%2Fhello`) rather than
    // a wildcard multi-segment match, so routes use `{name}`, not `{*name}`.
    let writes = Router::new()
        .route("/tools/{name}/versions", post(api::publish_version))
        .route("/tools/{name}/versions/{version}/attestations", post(api::attach_attestation))
        .route("/tools/{name}/versions/{version}/yank", post(api::yank_version))
        .route("/tools/{name}/versions/{version}/unyank", post(api::unyank_version))
        .route("/tools/{name}/visibility", patch(api::set_visibility))
        .route("/tools/{name}", delete(api::delete_tool))
        .layer(rate_limited);

    let reads = Router::new()
        .route("/health", get(api::health))
        .route("/tools/search", get(api::search_tools))
        .route("/tools/{name}", get(api::get_tool))
        .route("/tools/{name}/versions/{version}", get(api::get_version))
        .route("/tools/{name}/versions/{version}/download", get(api::download_version))
        .route("/tools/{name}/versions/{version}/attestations", get(api::list_attestations));

    reads
        .merge(writes)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(axum::middleware::from_fn(middleware::RequestLogger::layer))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
