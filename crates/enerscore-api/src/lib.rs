//! JSON REST API for enerscore.
//!
//! Exposes an axum [`Router`] backed by any
//! [`enerscore_core::store::SuitabilityStore`]. Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", enerscore_api::api_router(store.clone()))
//! ```

pub mod aggregates;
pub mod alerts;
pub mod error;
pub mod ingest;
pub mod measurements;
pub mod regions;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use enerscore_core::store::SuitabilityStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: SuitabilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    // Ingestion
    .route("/ingest", post(ingest::batch::<S>))
    .route("/ingest/log", get(ingest::log::<S>))
    // Regions
    .route("/regions", get(regions::list::<S>).post(regions::upsert::<S>))
    .route("/regions/{id}", get(regions::get_one::<S>))
    // Measurements and aggregates
    .route("/measurements/latest", get(measurements::latest::<S>))
    .route("/aggregates/daily", get(aggregates::daily::<S>))
    .route("/aggregates/monthly", get(aggregates::monthly::<S>))
    .route("/summary", get(aggregates::summary::<S>))
    // Alerting
    .route(
      "/alerts/rules",
      get(alerts::list_rules::<S>).post(alerts::create_rule::<S>),
    )
    .route("/alerts/rules/{id}/enable", post(alerts::enable_rule::<S>))
    .route("/alerts/rules/{id}/disable", post(alerts::disable_rule::<S>))
    .route("/alerts/events", get(alerts::list_events::<S>))
    .route(
      "/alerts/events/{id}/acknowledge",
      post(alerts::acknowledge::<S>),
    )
    .route("/alerts/events/{id}/resolve", post(alerts::resolve::<S>))
    .with_state(store)
}
