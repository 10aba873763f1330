// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
use anyhow::{Context, Result};
use clap::Parser;
use enact_registry_server::auth::{AuthConfig, Identity};
use enact_registry_server::{build_app, AppState};
use enact_registry_store::{BlobStore, RegistryStore};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "enact-registryd", version, about = "Enact skill registry service")]
struct Args {
    /// Bind address.
    #[arg(long, default_value = "127.0.0.1:8787")]
    bind: String,

    /// SQLite connection URL, e.g. `sqlite://registry.db` or `sqlite::memory:`.
    #[arg(long, default_value = "sqlite://registry.db")]
    database_url: String,

    /// Root directory for content-addressed bundle storage.
    #[arg(long, default_value = ".enact-registry/blobs")]
    blob_root: PathBuf,

    /// Path to a token file mapping `<token> <profile_id> <username>` per
    /// line. Omit to run in open mode, where every write is attributed to a
    /// synthetic admin identity.
    #[arg(long)]
    token_file: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.debug { EnvFilter::new("enact=debug") } else { EnvFilter::new("enact=info") };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let store = RegistryStore::connect(&args.database_url)
        .await
        .with_context(|| format!("connect to {}", args.database_url))?;

    tokio::fs::create_dir_all(&args.blob_root)
        .await
        .with_context(|| format!("create blob root {}", args.blob_root.display()))?;
    let blobs = BlobStore::new(args.blob_root.clone());

    let auth = match &args.token_file {
        Some(path) => load_token_file(path).await?,
        None => AuthConfig::open(),
    };

    let state = Arc::new(AppState::new(store, blobs, auth));
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&args.bind).await.with_context(|| format!("bind {}", args.bind))?;
    info!(bind = %args.bind, database_url = %args.database_url, "enact-registryd listening");

    axum::serve(listener, app).await.context("serve")
}

/// Parses a token file into an [`AuthConfig`] running in production mode.
///
/// Each non-blank, non-`#`-prefixed line is `<token> <profile_id> <username>`,
/// whitespace-separated.
async fn load_token_file(path: &std::path::Path) -> Result<AuthConfig> {
    let raw = tokio::fs::read_to_string(path).await.with_context(|| format!("read token file {}", path.display()))?;

    let mut tokens = HashMap::new();
    for (line_no, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let (token, profile_id, username) = match (parts.next(), parts.next(), parts.next()) {
            (Some(t), Some(p), Some(u)) => (t, p, u),
            _ => anyhow::bail!("{}:{}: expected `<token> <profile_id> <username>`", path.display(), line_no + 1),
        };
        tokens.insert(token.to_string(), Identity::new(profile_id, username));
    }

    Ok(AuthConfig::with_tokens(tokens))
}
