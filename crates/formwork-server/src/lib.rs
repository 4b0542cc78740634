//! HTTP server wiring for Formwork.
//!
//! Mounts the JSON API from `formwork-api` under `/api`, adds request
//! tracing, and prepares the store at startup.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::{Router, routing::get};
use formwork_core::{fixtures::seed_builtin_catalog, store::RecordStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `FORMWORK_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:          String,
  #[serde(default = "default_port")]
  pub port:          u16,
  #[serde(default = "default_database_path")]
  pub database_path: PathBuf,
  /// Install the built-in categories and record types on startup.
  #[serde(default)]
  pub seed_builtin:  bool,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 3000 }

fn default_database_path() -> PathBuf { PathBuf::from("formwork.db") }

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Startup ──────────────────────────────────────────────────────────────────

/// Seed the built-in catalog if asked, then bring every table up to date.
pub async fn prepare<S: RecordStore>(store: &S, seed: bool) -> Result<(), S::Error> {
  if seed {
    let summary = seed_builtin_catalog(store).await?;
    tracing::info!(
      categories = summary.categories,
      record_types = summary.record_types,
      "seeded built-in catalog"
    );
  }

  let reports = store.sync_all().await?;
  let failures: usize = reports.iter().map(|r| r.failures.len()).sum();
  if failures > 0 {
    tracing::warn!(failures, "startup sync finished with failures");
  } else {
    tracing::info!(tables = reports.len(), "startup sync finished");
  }
  Ok(())
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the application router: `/health` plus the API under `/api`.
pub fn router<S>(store: Arc<S>) -> Router
where
  S: RecordStore + 'static,
{
  Router::new()
    .route("/health", get(|| async { "ok" }))
    .nest("/api", formwork_api::api_router(store))
    .layer(TraceLayer::new_for_http())
}
