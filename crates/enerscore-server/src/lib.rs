//! HTTP server assembly for enerscore.
//!
//! Owns runtime configuration, idempotent provisioning of regions and alert
//! rules from `config.toml`, and the top-level router that mounts the JSON
//! API under `/api`.

pub mod provision;

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use enerscore_core::{
  alert::NewAlertRule, region::NewRegion, store::SuitabilityStore,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
///
/// `regions` and `alert_rules` are provisioning seeds: applied on every
/// startup, idempotently, before the server begins listening.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:        String,
  pub port:        u16,
  pub store_path:  PathBuf,
  #[serde(default)]
  pub regions:     Vec<NewRegion>,
  #[serde(default)]
  pub alert_rules: Vec<NewAlertRule>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the top-level router: the JSON API under `/api`, with request
/// tracing.
pub fn router<S>(store: Arc<S>) -> Router
where
  S: SuitabilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    .nest("/api", enerscore_api::api_router(store))
    .layer(TraceLayer::new_for_http())
}
