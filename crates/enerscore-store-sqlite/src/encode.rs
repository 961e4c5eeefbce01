//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings (always UTC, so string
//! comparison is chronological). Days are `YYYY-MM-DD`. Structured fields
//! (boundary, properties, classification, notify) are stored as compact
//! JSON. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, Utc};
use enerscore_core::{
  aggregate::{DailyAggregate, MonthlyAggregate, Rollup},
  alert::{AlertEvent, AlertRule, AlertState, Severity},
  measurement::{EnergySource, Measurement},
  quality::{IngestRecord, IngestStatus},
  region::Region,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> / NaiveDate ───────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_day(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_day(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── EnergySource ────────────────────────────────────────────────────────────

pub fn encode_source(s: EnergySource) -> &'static str { s.as_str() }

pub fn decode_source(s: &str) -> Result<EnergySource> {
  s.parse()
    .map_err(|_| Error::Core(enerscore_core::Error::UnknownSource(s.into())))
}

// ─── Severity ────────────────────────────────────────────────────────────────

pub fn encode_severity(s: Severity) -> &'static str {
  match s {
    Severity::Info => "info",
    Severity::Warning => "warning",
    Severity::Critical => "critical",
  }
}

pub fn decode_severity(s: &str) -> Result<Severity> {
  match s {
    "info" => Ok(Severity::Info),
    "warning" => Ok(Severity::Warning),
    "critical" => Ok(Severity::Critical),
    other => Err(Error::Decode(format!("unknown severity: {other:?}"))),
  }
}

// ─── AlertState ──────────────────────────────────────────────────────────────

pub fn encode_state(s: AlertState) -> &'static str {
  match s {
    AlertState::Active => "active",
    AlertState::Acknowledged => "acknowledged",
    AlertState::Resolved => "resolved",
  }
}

pub fn decode_state(s: &str) -> Result<AlertState> {
  match s {
    "active" => Ok(AlertState::Active),
    "acknowledged" => Ok(AlertState::Acknowledged),
    "resolved" => Ok(AlertState::Resolved),
    other => Err(Error::Decode(format!("unknown alert state: {other:?}"))),
  }
}

// ─── IngestStatus ────────────────────────────────────────────────────────────

pub fn encode_status(s: IngestStatus) -> &'static str {
  match s {
    IngestStatus::Success => "success",
    IngestStatus::Warning => "warning",
    IngestStatus::Error => "error",
  }
}

pub fn decode_status(s: &str) -> Result<IngestStatus> {
  match s {
    "success" => Ok(IngestStatus::Success),
    "warning" => Ok(IngestStatus::Warning),
    "error" => Ok(IngestStatus::Error),
    other => Err(Error::Decode(format!("unknown ingest status: {other:?}"))),
  }
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_json(v: &serde_json::Value) -> String { v.to_string() }

pub fn decode_json(s: &str) -> Result<serde_json::Value> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_notify(targets: &[String]) -> Result<String> {
  Ok(serde_json::to_string(targets)?)
}

pub fn decode_notify(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `regions` row.
pub struct RawRegion {
  pub region_id:  String,
  pub name:       String,
  pub boundary:   Option<String>,
  pub properties: String,
  pub created_at: String,
}

impl RawRegion {
  pub fn into_region(self) -> Result<Region> {
    Ok(Region {
      region_id:  self.region_id,
      name:       self.name,
      boundary:   self.boundary.as_deref().map(decode_json).transpose()?,
      properties: decode_json(&self.properties)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `measurements` row (or the
/// `current_measurements` view, which has the same columns).
pub struct RawMeasurement {
  pub recorded_at:    String,
  pub region_id:      String,
  pub source:         String,
  pub raw_value:      f64,
  pub normalized:     f64,
  pub classification: String,
  pub ingested_at:    String,
}

impl RawMeasurement {
  pub fn into_measurement(self) -> Result<Measurement> {
    Ok(Measurement {
      recorded_at:    decode_dt(&self.recorded_at)?,
      region_id:      self.region_id,
      source:         decode_source(&self.source)?,
      raw_value:      self.raw_value,
      normalized:     self.normalized,
      classification: decode_json(&self.classification)?,
      ingested_at:    decode_dt(&self.ingested_at)?,
    })
  }
}

/// Shared statistics columns of the two aggregate tables.
pub struct RawRollup {
  pub sample_count: i64,
  pub mean:         f64,
  pub min:          f64,
  pub max:          f64,
  pub stddev:       Option<f64>,
  pub p50:          f64,
  pub p90:          f64,
}

impl RawRollup {
  pub fn into_rollup(self) -> Rollup {
    Rollup {
      count:  self.sample_count as u64,
      mean:   self.mean,
      min:    self.min,
      max:    self.max,
      stddev: self.stddev,
      p50:    self.p50,
      p90:    self.p90,
    }
  }
}

pub struct RawDailyAggregate {
  pub day:         String,
  pub region_id:   String,
  pub source:      String,
  pub stats:       RawRollup,
  pub computed_at: String,
}

impl RawDailyAggregate {
  pub fn into_aggregate(self) -> Result<DailyAggregate> {
    Ok(DailyAggregate {
      day:         decode_day(&self.day)?,
      region_id:   self.region_id,
      source:      decode_source(&self.source)?,
      stats:       self.stats.into_rollup(),
      computed_at: decode_dt(&self.computed_at)?,
    })
  }
}

pub struct RawMonthlyAggregate {
  pub year:        i64,
  pub month:       i64,
  pub region_id:   String,
  pub source:      String,
  pub stats:       RawRollup,
  pub computed_at: String,
}

impl RawMonthlyAggregate {
  pub fn into_aggregate(self) -> Result<MonthlyAggregate> {
    Ok(MonthlyAggregate {
      year:        self.year as i32,
      month:       self.month as u32,
      region_id:   self.region_id,
      source:      decode_source(&self.source)?,
      stats:       self.stats.into_rollup(),
      computed_at: decode_dt(&self.computed_at)?,
    })
  }
}

/// Raw strings read directly from an `alert_rules` row.
pub struct RawAlertRule {
  pub rule_id:       String,
  pub name:          String,
  pub source:        String,
  pub threshold:     f64,
  pub severity:      String,
  pub enabled:       bool,
  pub notify:        String,
  pub suppress_secs: i64,
  pub created_at:    String,
}

impl RawAlertRule {
  pub fn into_rule(self) -> Result<AlertRule> {
    Ok(AlertRule {
      rule_id:       decode_uuid(&self.rule_id)?,
      name:          self.name,
      source:        decode_source(&self.source)?,
      threshold:     self.threshold,
      severity:      decode_severity(&self.severity)?,
      enabled:       self.enabled,
      notify:        decode_notify(&self.notify)?,
      suppress_secs: self.suppress_secs as u32,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `alert_events` row.
pub struct RawAlertEvent {
  pub event_id:         String,
  pub rule_id:          String,
  pub region_id:        String,
  pub source:           String,
  pub recorded_at:      String,
  pub current_value:    f64,
  pub threshold_value:  f64,
  pub severity:         String,
  pub state:            String,
  pub fired_at:         String,
  pub state_changed_at: String,
}

impl RawAlertEvent {
  pub fn into_event(self) -> Result<AlertEvent> {
    Ok(AlertEvent {
      event_id:         decode_uuid(&self.event_id)?,
      rule_id:          decode_uuid(&self.rule_id)?,
      region_id:        self.region_id,
      source:           decode_source(&self.source)?,
      recorded_at:      decode_dt(&self.recorded_at)?,
      current_value:    self.current_value,
      threshold_value:  self.threshold_value,
      severity:         decode_severity(&self.severity)?,
      state:            decode_state(&self.state)?,
      fired_at:         decode_dt(&self.fired_at)?,
      state_changed_at: decode_dt(&self.state_changed_at)?,
    })
  }
}

/// Raw strings read directly from an `ingest_log` row.
pub struct RawIngestRecord {
  pub ingest_id:  String,
  pub started_at: String,
  pub status:     String,
  pub accepted:   i64,
  pub rejected:   i64,
  pub message:    Option<String>,
}

impl RawIngestRecord {
  pub fn into_record(self) -> Result<IngestRecord> {
    Ok(IngestRecord {
      ingest_id:  decode_uuid(&self.ingest_id)?,
      started_at: decode_dt(&self.started_at)?,
      status:     decode_status(&self.status)?,
      accepted:   self.accepted as u32,
      rejected:   self.rejected as u32,
      message:    self.message,
    })
  }
}
