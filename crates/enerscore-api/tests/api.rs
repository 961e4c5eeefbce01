//! End-to-end tests for the API router against an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use enerscore_api::api_router;
use enerscore_core::{region::NewRegion, store::SuitabilityStore};
use enerscore_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

async fn app() -> Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  store
    .upsert_region(NewRegion::new("NG-LA", "Lagos"))
    .await
    .unwrap();
  store
    .upsert_region(NewRegion::new("NG-KN", "Kano"))
    .await
    .unwrap();
  api_router(Arc::new(store))
}

fn get(uri: &str) -> Request<Body> {
  Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
  Request::builder()
    .method("POST")
    .uri(uri)
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(body.to_string()))
    .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
  let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
    .await
    .unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

fn sample_batch() -> Value {
  json!({
    "type": "FeatureCollection",
    "recorded_at": "2026-03-14T12:00:00Z",
    "features": [
      {
        "type": "Feature",
        "properties": {
          "region_id": "NG-LA",
          "solar": { "raw": 5.6, "normalized": 0.78 }
        }
      },
      {
        "type": "Feature",
        "properties": {
          "region_id": "NG-KN",
          "solar": { "raw": 3.1, "normalized": 0.44 }
        }
      }
    ]
  })
}

#[tokio::test]
async fn ingest_then_read_back() {
  let app = app().await;

  let response = app
    .clone()
    .oneshot(post_json("/ingest", sample_batch()))
    .await
    .unwrap();
  assert_eq!(response.status(), StatusCode::CREATED);
  let report = body_json(response).await;
  assert_eq!(report["record"]["status"], "success");
  assert_eq!(report["record"]["accepted"], 2);

  let response = app
    .clone()
    .oneshot(get("/measurements/latest?region_id=NG-LA"))
    .await
    .unwrap();
  assert_eq!(response.status(), StatusCode::OK);
  let latest = body_json(response).await;
  assert_eq!(latest[0]["normalized"], 0.78);

  let response = app
    .clone()
    .oneshot(get("/summary?day=2026-03-14&source=solar"))
    .await
    .unwrap();
  assert_eq!(response.status(), StatusCode::OK);
  let summary = body_json(response).await;
  assert_eq!(summary["best"], "NG-LA");
  assert_eq!(summary["worst"], "NG-KN");
}

#[tokio::test]
async fn partial_batch_returns_multi_status() {
  let app = app().await;

  let mut batch = sample_batch();
  batch["features"][1]["properties"]["region_id"] = json!("NG-XX");

  let response = app
    .oneshot(post_json("/ingest", batch))
    .await
    .unwrap();
  assert_eq!(response.status(), StatusCode::MULTI_STATUS);
  let report = body_json(response).await;
  assert_eq!(report["record"]["status"], "warning");
  assert_eq!(report["failures"][0]["region_id"], "NG-XX");
}

#[tokio::test]
async fn missing_region_is_404() {
  let app = app().await;
  let response = app.oneshot(get("/regions/NG-XX")).await.unwrap();
  assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn daily_aggregate_for_key() {
  let app = app().await;

  app
    .clone()
    .oneshot(post_json("/ingest", sample_batch()))
    .await
    .unwrap();

  let response = app
    .oneshot(get(
      "/aggregates/daily?day=2026-03-14&region_id=NG-LA&source=solar",
    ))
    .await
    .unwrap();
  assert_eq!(response.status(), StatusCode::OK);
  let agg = body_json(response).await;
  assert_eq!(agg["stats"]["count"], 1);
  assert_eq!(agg["stats"]["mean"], 0.78);
}

#[tokio::test]
async fn alert_rule_lifecycle_over_http() {
  let app = app().await;

  let response = app
    .clone()
    .oneshot(post_json(
      "/alerts/rules",
      json!({
        "name": "excellent solar",
        "source": "solar",
        "threshold": 0.76,
        "severity": "warning"
      }),
    ))
    .await
    .unwrap();
  assert_eq!(response.status(), StatusCode::CREATED);

  // NG-LA's 0.78 breaches the 0.76 threshold; NG-KN's 0.44 does not.
  app
    .clone()
    .oneshot(post_json("/ingest", sample_batch()))
    .await
    .unwrap();

  let response = app
    .clone()
    .oneshot(get("/alerts/events?state=active"))
    .await
    .unwrap();
  let events = body_json(response).await;
  assert_eq!(events.as_array().unwrap().len(), 1);
  assert_eq!(events[0]["region_id"], "NG-LA");
  assert_eq!(events[0]["current_value"], 0.78);

  let id = events[0]["event_id"].as_str().unwrap().to_owned();
  let response = app
    .clone()
    .oneshot(post_json(
      &format!("/alerts/events/{id}/acknowledge"),
      json!({}),
    ))
    .await
    .unwrap();
  assert_eq!(response.status(), StatusCode::OK);
  let event = body_json(response).await;
  assert_eq!(event["state"], "acknowledged");
}

#[tokio::test]
async fn threshold_outside_unit_interval_rejected() {
  let app = app().await;

  let response = app
    .oneshot(post_json(
      "/alerts/rules",
      json!({
        "name": "impossible",
        "source": "solar",
        "threshold": 1.5,
        "severity": "info"
      }),
    ))
    .await
    .unwrap();
  assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
  let body = body_json(response).await;
  assert!(
    body["error"].as_str().unwrap().contains("threshold"),
    "body: {body}"
  );
}
