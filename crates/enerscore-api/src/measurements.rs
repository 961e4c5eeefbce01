//! Handlers for `/measurements` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/measurements/latest` | Optional `?region_id=`; latest per (region, source) |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use enerscore_core::{measurement::Measurement, store::SuitabilityStore};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct LatestParams {
  pub region_id: Option<String>,
}

/// `GET /measurements/latest[?region_id=<id>]`
pub async fn latest<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<LatestParams>,
) -> Result<Json<Vec<Measurement>>, ApiError>
where
  S: SuitabilityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let measurements = store
    .latest_measurements(params.region_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(measurements))
}
