//! Handlers for `/alerts` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/alerts/rules` | Optional `?enabled=true` to filter |
//! | `POST` | `/alerts/rules` | Body: [`NewAlertRule`]; returns 201 + rule |
//! | `POST` | `/alerts/rules/:id/enable` | Returns the updated rule |
//! | `POST` | `/alerts/rules/:id/disable` | Returns the updated rule |
//! | `GET`  | `/alerts/events` | Optional `state`, `rule_id`, `region_id`, `fired_after`, `limit` |
//! | `POST` | `/alerts/events/:id/acknowledge` | Active → Acknowledged |
//! | `POST` | `/alerts/events/:id/resolve` | Active/Acknowledged → Resolved |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use enerscore_core::{
  alert::{AlertEvent, AlertRule, AlertState, NewAlertRule},
  store::{AlertEventQuery, SuitabilityStore},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── Rules ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListRulesParams {
  #[serde(default)]
  pub enabled: bool,
}

/// `GET /alerts/rules[?enabled=true]`
pub async fn list_rules<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListRulesParams>,
) -> Result<Json<Vec<AlertRule>>, ApiError>
where
  S: SuitabilityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let rules = store
    .list_alert_rules(params.enabled)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(rules))
}

/// `POST /alerts/rules` — returns 201 + the stored rule.
pub async fn create_rule<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewAlertRule>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SuitabilityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if !(0.0..=1.0).contains(&body.threshold) {
    return Err(ApiError::Validation(format!(
      "threshold {} outside [0, 1]",
      body.threshold
    )));
  }
  let rule = store
    .add_alert_rule(body)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok((StatusCode::CREATED, Json(rule)))
}

/// `POST /alerts/rules/:id/enable`
pub async fn enable_rule<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<AlertRule>, ApiError>
where
  S: SuitabilityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  set_enabled(store, id, true).await
}

/// `POST /alerts/rules/:id/disable`
pub async fn disable_rule<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<AlertRule>, ApiError>
where
  S: SuitabilityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  set_enabled(store, id, false).await
}

async fn set_enabled<S>(
  store: Arc<S>,
  id: Uuid,
  enabled: bool,
) -> Result<Json<AlertRule>, ApiError>
where
  S: SuitabilityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let rule = store
    .set_rule_enabled(id, enabled)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(rule))
}

// ─── Events ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListEventsParams {
  pub state:       Option<AlertState>,
  pub rule_id:     Option<Uuid>,
  pub region_id:   Option<String>,
  pub fired_after: Option<DateTime<Utc>>,
  pub limit:       Option<usize>,
}

/// `GET /alerts/events` — newest first.
pub async fn list_events<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListEventsParams>,
) -> Result<Json<Vec<AlertEvent>>, ApiError>
where
  S: SuitabilityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let events = store
    .list_alert_events(AlertEventQuery {
      rule_id:     params.rule_id,
      region_id:   params.region_id,
      state:       params.state,
      fired_after: params.fired_after,
      limit:       params.limit,
    })
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(events))
}

/// `POST /alerts/events/:id/acknowledge`
pub async fn acknowledge<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<AlertEvent>, ApiError>
where
  S: SuitabilityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let event = store
    .acknowledge_alert(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(event))
}

/// `POST /alerts/events/:id/resolve`
pub async fn resolve<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<AlertEvent>, ApiError>
where
  S: SuitabilityStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let event = store
    .resolve_alert(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(event))
}
