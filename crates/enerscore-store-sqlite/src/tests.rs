//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use enerscore_core::{
  alert::{AlertState, NewAlertRule, Severity},
  batch::MeasurementBatch,
  measurement::{EnergySource, NewMeasurement},
  quality::IngestStatus,
  region::NewRegion,
  store::{AlertEventQuery, SuitabilityStore},
};
use serde_json::json;
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  let s = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  s.upsert_region(NewRegion::new("NG-LA", "Lagos"))
    .await
    .unwrap();
  s.upsert_region(NewRegion::new("NG-KN", "Kano"))
    .await
    .unwrap();
  s
}

fn at(hour: u32, min: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2026, 3, 14, hour, min, 0).unwrap()
}

fn day() -> NaiveDate {
  NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
}

fn solar(
  region: &str,
  recorded_at: DateTime<Utc>,
  normalized: f64,
) -> NewMeasurement {
  NewMeasurement::new(
    recorded_at,
    region,
    EnergySource::Solar,
    normalized * 7.0,
    normalized,
  )
}

fn close(a: f64, b: f64) -> bool {
  (a - b).abs() < 1e-9
}

// ─── Regions ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_region_preserves_created_at() {
  let s = store().await;

  let first = s.get_region("NG-LA").await.unwrap().unwrap();
  let updated = s
    .upsert_region(NewRegion::new("NG-LA", "Lagos State"))
    .await
    .unwrap();

  assert_eq!(updated.name, "Lagos State");
  assert_eq!(updated.created_at, first.created_at);
  assert_eq!(s.list_regions().await.unwrap().len(), 2);
}

#[tokio::test]
async fn get_region_missing_returns_none() {
  let s = store().await;
  assert!(s.get_region("NG-XX").await.unwrap().is_none());
}

// ─── Measurement upserts ─────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_and_latest() {
  let s = store().await;

  s.upsert_measurement(solar("NG-LA", at(6, 0), 0.41))
    .await
    .unwrap();
  s.upsert_measurement(solar("NG-LA", at(12, 0), 0.63))
    .await
    .unwrap();

  let latest = s.latest_measurements(Some("NG-LA".into())).await.unwrap();
  assert_eq!(latest.len(), 1);
  assert_eq!(latest[0].recorded_at, at(12, 0));
  assert!(close(latest[0].normalized, 0.63));
}

#[tokio::test]
async fn upsert_overwrites_in_place() {
  let s = store().await;

  s.upsert_measurement(solar("NG-LA", at(12, 0), 0.41))
    .await
    .unwrap();
  s.upsert_measurement(solar("NG-LA", at(12, 0), 0.63))
    .await
    .unwrap();

  let latest = s.latest_measurements(Some("NG-LA".into())).await.unwrap();
  assert_eq!(latest.len(), 1);
  assert!(close(latest[0].normalized, 0.63));

  // The overwritten row must not linger in the day's aggregate.
  let agg = s
    .get_daily_aggregate(day(), "NG-LA", EnergySource::Solar)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(agg.stats.count, 1);
  assert!(close(agg.stats.mean, 0.63));
}

#[tokio::test]
async fn unknown_region_rejected() {
  let s = store().await;
  let err = s
    .upsert_measurement(solar("NG-XX", at(12, 0), 0.5))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::RegionNotFound(id) if id == "NG-XX"));
}

#[tokio::test]
async fn out_of_range_values_rejected_before_write() {
  let s = store().await;

  let err = s
    .upsert_measurement(solar("NG-LA", at(12, 0), 1.2))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(enerscore_core::Error::NormalizedOutOfRange(_))
  ));

  let mut m = solar("NG-LA", at(12, 0), 0.5);
  m.raw_value = 99.0; // above the solar range
  assert!(s.upsert_measurement(m).await.is_err());

  assert!(
    s.latest_measurements(None).await.unwrap().is_empty(),
    "nothing may be written for a rejected record"
  );
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn daily_aggregate_statistics() {
  let s = store().await;

  for (hour, v) in [(6, 0.2), (12, 0.4), (18, 0.6)] {
    s.upsert_measurement(solar("NG-LA", at(hour, 0), v))
      .await
      .unwrap();
  }

  let agg = s
    .get_daily_aggregate(day(), "NG-LA", EnergySource::Solar)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(agg.stats.count, 3);
  assert!(close(agg.stats.mean, 0.4));
  assert!(close(agg.stats.min, 0.2));
  assert!(close(agg.stats.max, 0.6));
  assert!(close(agg.stats.stddev.unwrap(), 0.2));
  assert!(close(agg.stats.p50, 0.4));
}

#[tokio::test]
async fn single_sample_has_no_stddev() {
  let s = store().await;
  s.upsert_measurement(solar("NG-LA", at(12, 0), 0.5))
    .await
    .unwrap();

  let agg = s
    .get_daily_aggregate(day(), "NG-LA", EnergySource::Solar)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(agg.stats.count, 1);
  assert!(agg.stats.stddev.is_none());
  assert!(close(agg.stats.p50, 0.5));
  assert!(close(agg.stats.p90, 0.5));
}

#[tokio::test]
async fn monthly_aggregate_spans_days() {
  let s = store().await;

  s.upsert_measurement(solar("NG-LA", at(12, 0), 0.3))
    .await
    .unwrap();
  let next_day = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();
  s.upsert_measurement(solar("NG-LA", next_day, 0.5))
    .await
    .unwrap();

  let daily = s
    .get_daily_aggregate(day(), "NG-LA", EnergySource::Solar)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(daily.stats.count, 1);

  let monthly = s
    .get_monthly_aggregate(2026, 3, "NG-LA", EnergySource::Solar)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(monthly.stats.count, 2);
  assert!(close(monthly.stats.mean, 0.4));
}

#[tokio::test]
async fn aggregates_keyed_per_region_and_source() {
  let s = store().await;

  s.upsert_measurement(solar("NG-LA", at(12, 0), 0.7))
    .await
    .unwrap();
  s.upsert_measurement(solar("NG-KN", at(12, 0), 0.3))
    .await
    .unwrap();
  s.upsert_measurement(NewMeasurement::new(
    at(12, 0),
    "NG-LA",
    EnergySource::Wind,
    6.0,
    0.45,
  ))
  .await
  .unwrap();

  let all = s.list_daily_aggregates(day(), None).await.unwrap();
  assert_eq!(all.len(), 3);

  let solar_only = s
    .list_daily_aggregates(day(), Some(EnergySource::Solar))
    .await
    .unwrap();
  assert_eq!(solar_only.len(), 2);
  assert!(
    solar_only
      .iter()
      .all(|a| a.source == EnergySource::Solar)
  );
}

// ─── Batch ingestion ─────────────────────────────────────────────────────────

fn feature(region: &str, normalized: f64) -> serde_json::Value {
  json!({
    "type": "Feature",
    "properties": {
      "region_id": region,
      "solar": { "raw": normalized * 7.0, "normalized": normalized }
    }
  })
}

fn batch(features: Vec<serde_json::Value>) -> MeasurementBatch {
  serde_json::from_value(json!({
    "type": "FeatureCollection",
    "recorded_at": "2026-03-14T12:00:00Z",
    "features": features,
  }))
  .unwrap()
}

#[tokio::test]
async fn clean_batch_logs_success() {
  let s = store().await;

  let report = s
    .ingest_batch(batch(vec![feature("NG-LA", 0.6), feature("NG-KN", 0.3)]))
    .await
    .unwrap();

  assert_eq!(report.record.status, IngestStatus::Success);
  assert_eq!(report.record.accepted, 2);
  assert_eq!(report.record.rejected, 0);
  assert!(report.failures.is_empty());

  assert_eq!(s.latest_measurements(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn partial_failure_logs_warning_and_keeps_good_records() {
  let s = store().await;

  let report = s
    .ingest_batch(batch(vec![feature("NG-LA", 0.6), feature("NG-XX", 0.3)]))
    .await
    .unwrap();

  assert_eq!(report.record.status, IngestStatus::Warning);
  assert_eq!(report.record.accepted, 1);
  assert_eq!(report.record.rejected, 1);
  assert_eq!(report.failures.len(), 1);
  assert_eq!(report.failures[0].region_id.as_deref(), Some("NG-XX"));

  // The good record committed despite its sibling failing.
  let latest = s.latest_measurements(Some("NG-LA".into())).await.unwrap();
  assert_eq!(latest.len(), 1);
}

#[tokio::test]
async fn fully_failed_batch_logs_error() {
  let s = store().await;

  let report = s
    .ingest_batch(batch(vec![feature("NG-XX", 0.3)]))
    .await
    .unwrap();

  assert_eq!(report.record.status, IngestStatus::Error);
  assert_eq!(report.record.accepted, 0);
  assert_eq!(report.record.rejected, 1);
}

#[tokio::test]
async fn malformed_batch_logs_error_without_writing() {
  let s = store().await;

  let bad: MeasurementBatch = serde_json::from_value(json!({
    "type": "GeometryCollection",
    "recorded_at": "2026-03-14T12:00:00Z",
    "features": [feature("NG-LA", 0.6)],
  }))
  .unwrap();

  let report = s.ingest_batch(bad).await.unwrap();
  assert_eq!(report.record.status, IngestStatus::Error);
  assert!(s.latest_measurements(None).await.unwrap().is_empty());

  // The persisted row carries the same status.
  let log = s.list_ingest_log(10).await.unwrap();
  assert_eq!(log[0].status, IngestStatus::Error);
}

#[tokio::test]
async fn malformed_empty_batch_still_logs_error() {
  // Zero accepted and zero rejected must not read as success when the
  // batch itself was malformed.
  let s = store().await;

  let bad: MeasurementBatch = serde_json::from_value(json!({
    "type": "GeometryCollection",
    "recorded_at": "2026-03-14T12:00:00Z",
    "features": [],
  }))
  .unwrap();

  let report = s.ingest_batch(bad).await.unwrap();
  assert_eq!(report.record.status, IngestStatus::Error);
  assert_eq!(report.record.accepted, 0);
  assert_eq!(report.record.rejected, 0);
}

#[tokio::test]
async fn reingestion_is_idempotent() {
  let s = store().await;
  let b = batch(vec![feature("NG-LA", 0.6), feature("NG-KN", 0.3)]);

  s.ingest_batch(b.clone()).await.unwrap();
  let before = s
    .get_daily_aggregate(day(), "NG-LA", EnergySource::Solar)
    .await
    .unwrap()
    .unwrap();

  s.ingest_batch(b).await.unwrap();
  let after = s
    .get_daily_aggregate(day(), "NG-LA", EnergySource::Solar)
    .await
    .unwrap()
    .unwrap();

  assert_eq!(after.stats.count, before.stats.count);
  assert!(close(after.stats.mean, before.stats.mean));
  assert_eq!(s.latest_measurements(None).await.unwrap().len(), 2);

  // Both batches appear in the quality log.
  assert_eq!(s.list_ingest_log(10).await.unwrap().len(), 2);
}

// ─── Alerting ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn breach_fires_one_event_with_verbatim_values() {
  let s = store().await;
  let rule = s
    .add_alert_rule(NewAlertRule::new(
      "high solar",
      EnergySource::Solar,
      0.76,
      Severity::Warning,
    ))
    .await
    .unwrap();

  let (_, events) = s
    .upsert_measurement(solar("NG-LA", at(12, 0), 0.78))
    .await
    .unwrap();

  assert_eq!(events.len(), 1);
  let e = &events[0];
  assert_eq!(e.rule_id, rule.rule_id);
  assert_eq!(e.region_id, "NG-LA");
  assert!(close(e.current_value, 0.78));
  assert!(close(e.threshold_value, 0.76));
  assert_eq!(e.severity, Severity::Warning);
  assert_eq!(e.state, AlertState::Active);
  assert_eq!(e.recorded_at, at(12, 0));
}

#[tokio::test]
async fn at_or_below_threshold_fires_nothing() {
  let s = store().await;
  s.add_alert_rule(NewAlertRule::new(
    "high solar",
    EnergySource::Solar,
    0.76,
    Severity::Warning,
  ))
  .await
  .unwrap();

  let (_, at_threshold) = s
    .upsert_measurement(solar("NG-LA", at(11, 0), 0.76))
    .await
    .unwrap();
  let (_, below) = s
    .upsert_measurement(solar("NG-LA", at(12, 0), 0.5))
    .await
    .unwrap();

  assert!(at_threshold.is_empty());
  assert!(below.is_empty());
}

#[tokio::test]
async fn rules_fire_independently() {
  let s = store().await;
  s.add_alert_rule(NewAlertRule::new(
    "good solar",
    EnergySource::Solar,
    0.5,
    Severity::Info,
  ))
  .await
  .unwrap();
  s.add_alert_rule(NewAlertRule::new(
    "excellent solar",
    EnergySource::Solar,
    0.76,
    Severity::Warning,
  ))
  .await
  .unwrap();
  s.add_alert_rule(NewAlertRule::new(
    "high wind",
    EnergySource::Wind,
    0.1,
    Severity::Critical,
  ))
  .await
  .unwrap();

  let (_, events) = s
    .upsert_measurement(solar("NG-LA", at(12, 0), 0.78))
    .await
    .unwrap();

  // Both solar rules fire; the wind rule is out of scope.
  assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn disabled_rule_does_not_fire() {
  let s = store().await;
  let rule = s
    .add_alert_rule(NewAlertRule::new(
      "high solar",
      EnergySource::Solar,
      0.5,
      Severity::Warning,
    ))
    .await
    .unwrap();
  s.set_rule_enabled(rule.rule_id, false).await.unwrap();

  let (_, events) = s
    .upsert_measurement(solar("NG-LA", at(12, 0), 0.9))
    .await
    .unwrap();
  assert!(events.is_empty());

  assert_eq!(s.list_alert_rules(true).await.unwrap().len(), 0);
  assert_eq!(s.list_alert_rules(false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn suppression_window_absorbs_refires() {
  let s = store().await;
  let mut rule = NewAlertRule::new(
    "high solar",
    EnergySource::Solar,
    0.5,
    Severity::Warning,
  );
  rule.suppress_secs = 3600;
  s.add_alert_rule(rule).await.unwrap();

  let (_, first) = s
    .upsert_measurement(solar("NG-LA", at(12, 0), 0.9))
    .await
    .unwrap();
  let (_, second) = s
    .upsert_measurement(solar("NG-LA", at(12, 30), 0.9))
    .await
    .unwrap();

  assert_eq!(first.len(), 1);
  assert!(second.is_empty(), "re-fire inside the window is suppressed");

  // Suppression is scoped per region.
  let (_, other_region) = s
    .upsert_measurement(solar("NG-KN", at(12, 30), 0.9))
    .await
    .unwrap();
  assert_eq!(other_region.len(), 1);
}

#[tokio::test]
async fn zero_suppression_fires_every_breach() {
  let s = store().await;
  s.add_alert_rule(NewAlertRule::new(
    "high solar",
    EnergySource::Solar,
    0.5,
    Severity::Warning,
  ))
  .await
  .unwrap();

  let (_, first) = s
    .upsert_measurement(solar("NG-LA", at(12, 0), 0.9))
    .await
    .unwrap();
  let (_, second) = s
    .upsert_measurement(solar("NG-LA", at(12, 30), 0.9))
    .await
    .unwrap();
  assert_eq!(first.len() + second.len(), 2);
}

#[tokio::test]
async fn event_lifecycle_transitions() {
  let s = store().await;
  s.add_alert_rule(NewAlertRule::new(
    "high solar",
    EnergySource::Solar,
    0.5,
    Severity::Warning,
  ))
  .await
  .unwrap();
  let (_, events) = s
    .upsert_measurement(solar("NG-LA", at(12, 0), 0.9))
    .await
    .unwrap();
  let event_id = events[0].event_id;

  let acked = s.acknowledge_alert(event_id).await.unwrap();
  assert_eq!(acked.state, AlertState::Acknowledged);

  let resolved = s.resolve_alert(event_id).await.unwrap();
  assert_eq!(resolved.state, AlertState::Resolved);

  // Resolved is terminal.
  let err = s.acknowledge_alert(event_id).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(enerscore_core::Error::IllegalTransition { .. })
  ));
}

#[tokio::test]
async fn duplicate_acknowledge_rejected() {
  let s = store().await;
  s.add_alert_rule(NewAlertRule::new(
    "high solar",
    EnergySource::Solar,
    0.5,
    Severity::Warning,
  ))
  .await
  .unwrap();
  let (_, events) = s
    .upsert_measurement(solar("NG-LA", at(12, 0), 0.9))
    .await
    .unwrap();
  let event_id = events[0].event_id;

  let acked = s.acknowledge_alert(event_id).await.unwrap();

  // A second acknowledge must be rejected without touching the row.
  let err = s.acknowledge_alert(event_id).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(enerscore_core::Error::IllegalTransition {
      from: AlertState::Acknowledged,
      ..
    })
  ));

  let stored = s
    .list_alert_events(AlertEventQuery {
      state: Some(AlertState::Acknowledged),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(stored.len(), 1);
  assert_eq!(stored[0].state_changed_at, acked.state_changed_at);
}

#[tokio::test]
async fn transition_on_missing_event_fails() {
  let s = store().await;
  let err = s.acknowledge_alert(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::EventNotFound(_)));
}

#[tokio::test]
async fn list_alert_events_filters() {
  let s = store().await;
  s.add_alert_rule(NewAlertRule::new(
    "high solar",
    EnergySource::Solar,
    0.5,
    Severity::Warning,
  ))
  .await
  .unwrap();

  let (_, la) = s
    .upsert_measurement(solar("NG-LA", at(12, 0), 0.9))
    .await
    .unwrap();
  s.upsert_measurement(solar("NG-KN", at(12, 0), 0.8))
    .await
    .unwrap();
  s.resolve_alert(la[0].event_id).await.unwrap();

  let active = s
    .list_alert_events(AlertEventQuery {
      state: Some(AlertState::Active),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(active.len(), 1);
  assert_eq!(active[0].region_id, "NG-KN");

  let lagos = s
    .list_alert_events(AlertEventQuery {
      region_id: Some("NG-LA".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(lagos.len(), 1);
  assert_eq!(lagos[0].state, AlertState::Resolved);

  let limited = s
    .list_alert_events(AlertEventQuery {
      limit: Some(1),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(limited.len(), 1);
}

// ─── Summaries ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn region_summaries_rank_by_mean() {
  let s = store().await;
  s.upsert_region(NewRegion::new("NG-RI", "Rivers"))
    .await
    .unwrap();

  s.upsert_measurement(solar("NG-LA", at(12, 0), 0.7))
    .await
    .unwrap();
  s.upsert_measurement(solar("NG-KN", at(12, 0), 0.3))
    .await
    .unwrap();
  // NG-RI has no measurements for the day.

  let report = s
    .region_summaries(day(), EnergySource::Solar)
    .await
    .unwrap();

  assert_eq!(report.regions.len(), 3);
  assert_eq!(report.best.as_deref(), Some("NG-LA"));
  assert_eq!(report.worst.as_deref(), Some("NG-KN"));

  let rivers = report
    .regions
    .iter()
    .find(|r| r.region.region_id == "NG-RI")
    .unwrap();
  assert!(rivers.aggregate.is_none());
}

#[tokio::test]
async fn region_summaries_empty_day() {
  let s = store().await;
  let report = s
    .region_summaries(day(), EnergySource::Solar)
    .await
    .unwrap();
  assert_eq!(report.regions.len(), 2);
  assert!(report.best.is_none());
  assert!(report.worst.is_none());
}
