//! Handlers for `/aggregates` and `/summary` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/aggregates/daily` | `?day=` required; optional `region_id` + `source` |
//! | `GET`  | `/aggregates/monthly` | `?year=&month=&region_id=&source=` all required |
//! | `GET`  | `/summary` | `?day=&source=`; per-region aggregates plus best/worst |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
  response::IntoResponse,
};
use chrono::NaiveDate;
use enerscore_core::{
  aggregate::MonthlyAggregate,
  measurement::EnergySource,
  store::{RegionSummaryReport, SuitabilityStore},
};
use serde::Deserialize;

use crate::error::ApiError;

// ─── Daily ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DailyParams {
  pub day:       NaiveDate,
  pub region_id: Option<String>,
  pub source:    Option<EnergySource>,
}

/// `GET /aggregates/daily?day=YYYY-MM-DD[&region_id=...][&source=...]`
///
/// With both `region_id` and `source` this returns the single aggregate row
/// (404 if absent); otherwise a list for the day, optionally filtered by
/// source.
pub async fn daily<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<DailyParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SuitabilityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  match (&params.region_id, params.source) {
    (Some(region_id), Some(source)) => {
      let agg = store
        .get_daily_aggregate(params.day, region_id, source)
        .await
        .map_err(|e| ApiError::Store(Box::new(e)))?
        .ok_or_else(|| {
          ApiError::NotFound(format!(
            "no {source} aggregate for {region_id} on {}",
            params.day
          ))
        })?;
      Ok(Json(agg).into_response())
    }
    (Some(_), None) => Err(ApiError::BadRequest(
      "region_id requires source".into(),
    )),
    (None, source) => {
      let aggs = store
        .list_daily_aggregates(params.day, source)
        .await
        .map_err(|e| ApiError::Store(Box::new(e)))?;
      Ok(Json(aggs).into_response())
    }
  }
}

// ─── Monthly ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MonthlyParams {
  pub year:      i32,
  pub month:     u32,
  pub region_id: String,
  pub source:    EnergySource,
}

/// `GET /aggregates/monthly?year=&month=&region_id=&source=`
pub async fn monthly<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<MonthlyParams>,
) -> Result<Json<MonthlyAggregate>, ApiError>
where
  S: SuitabilityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let agg = store
    .get_monthly_aggregate(
      params.year,
      params.month,
      &params.region_id,
      params.source,
    )
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| {
      ApiError::NotFound(format!(
        "no {} aggregate for {} in {}-{:02}",
        params.source, params.region_id, params.year, params.month
      ))
    })?;
  Ok(Json(agg))
}

// ─── Summary ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
  pub day:    NaiveDate,
  pub source: EnergySource,
}

/// `GET /summary?day=YYYY-MM-DD&source=<source>`
pub async fn summary<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<SummaryParams>,
) -> Result<Json<RegionSummaryReport>, ApiError>
where
  S: SuitabilityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let report = store
    .region_summaries(params.day, params.source)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(report))
}
