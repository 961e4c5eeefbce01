//! Handlers for `/ingest` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/ingest` | Body: GeoJSON [`MeasurementBatch`]; returns the batch report |
//! | `GET`  | `/ingest/log` | Optional `?limit=` (default 50), newest first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use enerscore_core::{
  batch::MeasurementBatch,
  quality::{IngestRecord, IngestStatus},
  store::SuitabilityStore,
};
use serde::Deserialize;

use crate::error::ApiError;

/// `POST /ingest` — body is a GeoJSON `FeatureCollection` plus `recorded_at`.
///
/// Always returns the whole-batch report; the status code reflects the
/// quality-log outcome (`207` when some records were rejected, `422` when
/// none were accepted).
pub async fn batch<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<MeasurementBatch>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SuitabilityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let report = store
    .ingest_batch(body)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  let status = match report.record.status {
    IngestStatus::Success => StatusCode::CREATED,
    IngestStatus::Warning => StatusCode::MULTI_STATUS,
    IngestStatus::Error => StatusCode::UNPROCESSABLE_ENTITY,
  };
  Ok((status, Json(report)))
}

#[derive(Debug, Deserialize)]
pub struct LogParams {
  pub limit: Option<usize>,
}

/// `GET /ingest/log[?limit=<n>]`
pub async fn log<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<LogParams>,
) -> Result<Json<Vec<IngestRecord>>, ApiError>
where
  S: SuitabilityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let records = store
    .list_ingest_log(params.limit.unwrap_or(50))
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(records))
}
