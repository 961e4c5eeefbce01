//! The `SuitabilityStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `enerscore-store-sqlite`). Higher layers (`enerscore-api`,
//! `enerscore-server`) depend on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  aggregate::{DailyAggregate, MonthlyAggregate},
  alert::{AlertEvent, AlertRule, AlertState, NewAlertRule},
  batch::MeasurementBatch,
  measurement::{EnergySource, Measurement, NewMeasurement},
  quality::{IngestRecord, IngestReport},
  region::{NewRegion, Region},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`SuitabilityStore::list_alert_events`].
#[derive(Debug, Clone, Default)]
pub struct AlertEventQuery {
  pub rule_id:     Option<Uuid>,
  pub region_id:   Option<String>,
  pub state:       Option<AlertState>,
  /// Restrict to events fired at or after this instant.
  pub fired_after: Option<DateTime<Utc>>,
  pub limit:       Option<usize>,
}

// ─── Report types ────────────────────────────────────────────────────────────

/// One region's entry in the regional summary view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionSummary {
  pub region:    Region,
  /// The day's aggregate for the requested source, if any measurements
  /// landed that day.
  pub aggregate: Option<DailyAggregate>,
}

/// The regional summary view: per-region aggregates for one (day, source),
/// plus the best and worst performing region by mean.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionSummaryReport {
  pub day:     NaiveDate,
  pub source:  EnergySource,
  pub regions: Vec<RegionSummary>,
  pub best:    Option<String>,
  pub worst:   Option<String>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an enerscore storage backend.
///
/// Measurement writes are upserts keyed by (recorded_at, region, source).
/// Aggregate recomputation and alert evaluation run inside the same
/// transaction as the triggering insert — if either fails, the insert is
/// rejected as a whole.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait SuitabilityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Regions ───────────────────────────────────────────────────────────

  /// Insert or update a region, keyed by `region_id`. `created_at` is
  /// preserved across updates.
  fn upsert_region(
    &self,
    input: NewRegion,
  ) -> impl Future<Output = Result<Region, Self::Error>> + Send + '_;

  /// Retrieve a region by id. Returns `None` if not found.
  fn get_region<'a>(
    &'a self,
    region_id: &'a str,
  ) -> impl Future<Output = Result<Option<Region>, Self::Error>> + Send + 'a;

  /// List all regions, ordered by id.
  fn list_regions(
    &self,
  ) -> impl Future<Output = Result<Vec<Region>, Self::Error>> + Send + '_;

  // ── Ingestion ─────────────────────────────────────────────────────────

  /// Ingest a GeoJSON-shaped batch for one timestamp.
  ///
  /// Each record runs in its own transaction: upsert, daily and monthly
  /// aggregate recomputation, and alert evaluation commit or roll back
  /// together. A failed record does not abort the rest of the batch. One
  /// quality-log row records the whole batch outcome.
  fn ingest_batch(
    &self,
    batch: MeasurementBatch,
  ) -> impl Future<Output = Result<IngestReport, Self::Error>> + Send + '_;

  /// Single-record form of the ingestion pipeline. Returns the committed
  /// measurement and any alert events it fired.
  fn upsert_measurement(
    &self,
    input: NewMeasurement,
  ) -> impl Future<
    Output = Result<(Measurement, Vec<AlertEvent>), Self::Error>,
  > + Send
  + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// The latest measurement per (region, source) key, optionally
  /// restricted to one region.
  fn latest_measurements(
    &self,
    region_id: Option<String>,
  ) -> impl Future<Output = Result<Vec<Measurement>, Self::Error>> + Send + '_;

  /// The daily aggregate for one (day, region, source) key.
  fn get_daily_aggregate<'a>(
    &'a self,
    day: NaiveDate,
    region_id: &'a str,
    source: EnergySource,
  ) -> impl Future<Output = Result<Option<DailyAggregate>, Self::Error>>
  + Send
  + 'a;

  /// All daily aggregates for one day, optionally restricted to a source.
  fn list_daily_aggregates(
    &self,
    day: NaiveDate,
    source: Option<EnergySource>,
  ) -> impl Future<Output = Result<Vec<DailyAggregate>, Self::Error>>
  + Send
  + '_;

  /// The monthly aggregate for one (year, month, region, source) key.
  fn get_monthly_aggregate<'a>(
    &'a self,
    year: i32,
    month: u32,
    region_id: &'a str,
    source: EnergySource,
  ) -> impl Future<Output = Result<Option<MonthlyAggregate>, Self::Error>>
  + Send
  + 'a;

  /// The regional summary view for one (day, source): every region with
  /// its aggregate, plus best/worst by mean.
  fn region_summaries(
    &self,
    day: NaiveDate,
    source: EnergySource,
  ) -> impl Future<Output = Result<RegionSummaryReport, Self::Error>>
  + Send
  + '_;

  // ── Alerting ──────────────────────────────────────────────────────────

  /// Persist a new alert rule.
  fn add_alert_rule(
    &self,
    input: NewAlertRule,
  ) -> impl Future<Output = Result<AlertRule, Self::Error>> + Send + '_;

  /// List alert rules; `only_enabled` filters out disabled ones.
  fn list_alert_rules(
    &self,
    only_enabled: bool,
  ) -> impl Future<Output = Result<Vec<AlertRule>, Self::Error>> + Send + '_;

  /// Enable or disable a rule. Returns the updated rule.
  fn set_rule_enabled(
    &self,
    rule_id: Uuid,
    enabled: bool,
  ) -> impl Future<Output = Result<AlertRule, Self::Error>> + Send + '_;

  /// List alert events matching `query`, newest first.
  fn list_alert_events(
    &self,
    query: AlertEventQuery,
  ) -> impl Future<Output = Result<Vec<AlertEvent>, Self::Error>> + Send + '_;

  /// Transition an event Active→Acknowledged.
  fn acknowledge_alert(
    &self,
    event_id: Uuid,
  ) -> impl Future<Output = Result<AlertEvent, Self::Error>> + Send + '_;

  /// Transition an event to Resolved (from Active or Acknowledged).
  fn resolve_alert(
    &self,
    event_id: Uuid,
  ) -> impl Future<Output = Result<AlertEvent, Self::Error>> + Send + '_;

  // ── Quality log ───────────────────────────────────────────────────────

  /// The most recent quality-log rows, newest first.
  fn list_ingest_log(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<IngestRecord>, Self::Error>> + Send + '_;
}
