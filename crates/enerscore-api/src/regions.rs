//! Handlers for `/regions` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/regions` | All regions, ordered by id |
//! | `POST` | `/regions` | Body: [`enerscore_core::region::NewRegion`]; upsert |
//! | `GET`  | `/regions/:id` | 404 if not found |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use enerscore_core::{
  region::{NewRegion, Region},
  store::SuitabilityStore,
};

use crate::error::ApiError;

/// `GET /regions`
pub async fn list<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Region>>, ApiError>
where
  S: SuitabilityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let regions = store
    .list_regions()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(regions))
}

/// `POST /regions` — upsert keyed by `region_id`.
pub async fn upsert<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewRegion>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SuitabilityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let region = store
    .upsert_region(body)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok((StatusCode::CREATED, Json(region)))
}

/// `GET /regions/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<Json<Region>, ApiError>
where
  S: SuitabilityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let region = store
    .get_region(&id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("region {id} not found")))?;
  Ok(Json(region))
}
