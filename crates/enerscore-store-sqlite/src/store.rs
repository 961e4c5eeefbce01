//! [`SqliteStore`] — the SQLite implementation of [`SuitabilityStore`].
//!
//! The ingestion pipeline runs the original schema's trigger work as
//! explicit stages: measurement upsert, daily and monthly aggregate
//! recomputation, and alert evaluation all commit or roll back together,
//! one transaction per batch member.

use std::path::Path;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use enerscore_core::{
  aggregate::{DailyAggregate, MonthlyAggregate, Rollup},
  alert::{AlertEvent, AlertRule, AlertState, NewAlertRule},
  batch::MeasurementBatch,
  measurement::{EnergySource, Measurement, NewMeasurement},
  quality::{IngestRecord, IngestReport, IngestStatus, MemberFailure},
  region::{NewRegion, Region},
  store::{
    AlertEventQuery, RegionSummary, RegionSummaryReport, SuitabilityStore,
  },
};

use crate::{
  Error, Result,
  encode::{
    RawAlertEvent, RawAlertRule, RawDailyAggregate, RawIngestRecord,
    RawMeasurement, RawMonthlyAggregate, RawRegion, RawRollup, decode_state,
    encode_day, encode_dt, encode_json, encode_notify, encode_severity,
    encode_source, encode_state, encode_status, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An enerscore store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All access
/// is serialised on the connection's thread, which is also what gives the
/// per-member transactions their single-writer semantics.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Per-member pipeline (sync, runs on the connection thread) ───────────────

/// Outcome of one batch member's transaction.
enum MemberDbOutcome {
  /// Committed; carries the raw alert events fired by this record.
  Committed(Vec<RawAlertEvent>),
  /// Rolled back: the record referenced an unprovisioned region.
  UnknownRegion,
}

/// Run the full pipeline for one record inside one transaction:
/// upsert → recompute daily aggregate → recompute monthly aggregate →
/// evaluate alert rules. Any error rolls the whole member back.
fn ingest_member(
  conn: &mut rusqlite::Connection,
  m: &NewMeasurement,
  now: DateTime<Utc>,
) -> rusqlite::Result<MemberDbOutcome> {
  let tx = conn.transaction()?;

  let region_known: bool = tx
    .query_row(
      "SELECT 1 FROM regions WHERE region_id = ?1",
      rusqlite::params![m.region_id],
      |_| Ok(true),
    )
    .optional()?
    .unwrap_or(false);
  if !region_known {
    return Ok(MemberDbOutcome::UnknownRegion);
  }

  let now_str = encode_dt(now);
  let recorded_at_str = encode_dt(m.recorded_at);
  let source_str = encode_source(m.source);

  // Stage 1: upsert keyed by (recorded_at, region_id, source).
  tx.execute(
    "INSERT INTO measurements (
       recorded_at, region_id, source,
       raw_value, normalized, classification, ingested_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
     ON CONFLICT (recorded_at, region_id, source) DO UPDATE SET
       raw_value      = excluded.raw_value,
       normalized     = excluded.normalized,
       classification = excluded.classification,
       ingested_at    = excluded.ingested_at",
    rusqlite::params![
      recorded_at_str,
      m.region_id,
      source_str,
      m.raw_value,
      m.normalized,
      encode_json(&m.classification),
      now_str,
    ],
  )?;

  // Stage 2: replace the daily and monthly rollups for this record's
  // periods, recomputed from all committed measurements sharing the key.
  let day = m.recorded_at.date_naive();
  recompute_period(
    &tx,
    m,
    &encode_day(day),
    PeriodTable::Daily,
    &now_str,
  )?;
  recompute_period(
    &tx,
    m,
    &day.format("%Y-%m").to_string(),
    PeriodTable::Monthly { year: day.year(), month: day.month() },
    &now_str,
  )?;

  // Stage 3: evaluate every enabled rule for this source independently.
  let events = evaluate_rules(&tx, m, now, &recorded_at_str, &now_str)?;

  tx.commit()?;
  Ok(MemberDbOutcome::Committed(events))
}

enum PeriodTable {
  Daily,
  Monthly { year: i32, month: u32 },
}

/// Recompute one aggregate row from the measurements whose `recorded_at`
/// starts with `prefix` (`YYYY-MM-DD` for days, `YYYY-MM` for months).
/// Timestamps are stored as UTC RFC 3339, so the prefix match is exact.
fn recompute_period(
  tx: &rusqlite::Transaction<'_>,
  m: &NewMeasurement,
  prefix: &str,
  table: PeriodTable,
  now_str: &str,
) -> rusqlite::Result<()> {
  let mut stmt = tx.prepare(
    "SELECT normalized FROM measurements
     WHERE region_id = ?1 AND source = ?2
       AND substr(recorded_at, 1, length(?3)) = ?3",
  )?;
  let values: Vec<f64> = stmt
    .query_map(
      rusqlite::params![m.region_id, encode_source(m.source), prefix],
      |row| row.get(0),
    )?
    .collect::<rusqlite::Result<_>>()?;
  drop(stmt);

  // The upsert in stage 1 guarantees at least one value.
  let Some(stats) = Rollup::from_values(&values) else {
    return Ok(());
  };

  match table {
    PeriodTable::Daily => tx.execute(
      "INSERT OR REPLACE INTO daily_aggregates (
         day, region_id, source,
         sample_count, mean, min, max, stddev, p50, p90, computed_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
      rusqlite::params![
        prefix,
        m.region_id,
        encode_source(m.source),
        stats.count as i64,
        stats.mean,
        stats.min,
        stats.max,
        stats.stddev,
        stats.p50,
        stats.p90,
        now_str,
      ],
    )?,
    PeriodTable::Monthly { year, month } => tx.execute(
      "INSERT OR REPLACE INTO monthly_aggregates (
         year, month, region_id, source,
         sample_count, mean, min, max, stddev, p50, p90, computed_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
      rusqlite::params![
        year,
        month,
        m.region_id,
        encode_source(m.source),
        stats.count as i64,
        stats.mean,
        stats.min,
        stats.max,
        stats.stddev,
        stats.p50,
        stats.p90,
        now_str,
      ],
    )?,
  };
  Ok(())
}

/// Evaluate all enabled rules for the record's source; insert one event per
/// firing rule. Suppression (when a rule opts in) is per (rule, region).
fn evaluate_rules(
  tx: &rusqlite::Transaction<'_>,
  m: &NewMeasurement,
  now: DateTime<Utc>,
  recorded_at_str: &str,
  now_str: &str,
) -> rusqlite::Result<Vec<RawAlertEvent>> {
  let mut stmt = tx.prepare(
    "SELECT rule_id, threshold, severity, suppress_secs
     FROM alert_rules WHERE enabled = 1 AND source = ?1",
  )?;
  let rules: Vec<(String, f64, String, i64)> = stmt
    .query_map(rusqlite::params![encode_source(m.source)], |row| {
      Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    })?
    .collect::<rusqlite::Result<_>>()?;
  drop(stmt);

  let mut events = Vec::new();
  for (rule_id, threshold, severity, suppress_secs) in rules {
    if m.normalized <= threshold {
      continue;
    }

    if suppress_secs > 0 {
      let cutoff = encode_dt(now - chrono::Duration::seconds(suppress_secs));
      let recent: bool = tx
        .query_row(
          "SELECT 1 FROM alert_events
           WHERE rule_id = ?1 AND region_id = ?2 AND fired_at > ?3
           LIMIT 1",
          rusqlite::params![rule_id, m.region_id, cutoff],
          |_| Ok(true),
        )
        .optional()?
        .unwrap_or(false);
      if recent {
        continue;
      }
    }

    let event = RawAlertEvent {
      event_id:         encode_uuid(Uuid::new_v4()),
      rule_id:          rule_id.clone(),
      region_id:        m.region_id.clone(),
      source:           encode_source(m.source).to_owned(),
      recorded_at:      recorded_at_str.to_owned(),
      current_value:    m.normalized,
      threshold_value:  threshold,
      severity:         severity.clone(),
      state:            "active".to_owned(),
      fired_at:         now_str.to_owned(),
      state_changed_at: now_str.to_owned(),
    };

    tx.execute(
      "INSERT INTO alert_events (
         event_id, rule_id, region_id, source, recorded_at,
         current_value, threshold_value, severity,
         state, fired_at, state_changed_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
      rusqlite::params![
        event.event_id,
        event.rule_id,
        event.region_id,
        event.source,
        event.recorded_at,
        event.current_value,
        event.threshold_value,
        event.severity,
        event.state,
        event.fired_at,
        event.state_changed_at,
      ],
    )?;
    events.push(event);
  }

  Ok(events)
}

/// Result of one batch member as reported back from the connection thread.
enum MemberOut {
  Committed { events: Vec<RawAlertEvent> },
  Failed { region_id: String, reason: String },
}

// ─── SuitabilityStore impl ───────────────────────────────────────────────────

impl SuitabilityStore for SqliteStore {
  type Error = Error;

  // ── Regions ───────────────────────────────────────────────────────────────

  async fn upsert_region(&self, input: NewRegion) -> Result<Region> {
    let id_str = input.region_id.clone();
    let name = input.name.clone();
    let boundary_str = input.boundary.as_ref().map(encode_json);
    let properties_str = encode_json(&input.properties);
    let created_at_str = encode_dt(Utc::now());

    let raw: RawRegion = self
      .conn
      .call(move |conn| {
        // created_at is preserved across updates.
        conn.execute(
          "INSERT INTO regions (region_id, name, boundary, properties, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (region_id) DO UPDATE SET
             name       = excluded.name,
             boundary   = excluded.boundary,
             properties = excluded.properties",
          rusqlite::params![
            id_str, name, boundary_str, properties_str, created_at_str
          ],
        )?;

        Ok(conn.query_row(
          "SELECT region_id, name, boundary, properties, created_at
           FROM regions WHERE region_id = ?1",
          rusqlite::params![id_str],
          |row| {
            Ok(RawRegion {
              region_id:  row.get(0)?,
              name:       row.get(1)?,
              boundary:   row.get(2)?,
              properties: row.get(3)?,
              created_at: row.get(4)?,
            })
          },
        )?)
      })
      .await?;

    raw.into_region()
  }

  async fn get_region(&self, region_id: &str) -> Result<Option<Region>> {
    let id_str = region_id.to_owned();

    let raw: Option<RawRegion> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT region_id, name, boundary, properties, created_at
               FROM regions WHERE region_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawRegion {
                  region_id:  row.get(0)?,
                  name:       row.get(1)?,
                  boundary:   row.get(2)?,
                  properties: row.get(3)?,
                  created_at: row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRegion::into_region).transpose()
  }

  async fn list_regions(&self) -> Result<Vec<Region>> {
    let raws: Vec<RawRegion> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT region_id, name, boundary, properties, created_at
           FROM regions ORDER BY region_id",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawRegion {
              region_id:  row.get(0)?,
              name:       row.get(1)?,
              boundary:   row.get(2)?,
              properties: row.get(3)?,
              created_at: row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRegion::into_region).collect()
  }

  // ── Ingestion ─────────────────────────────────────────────────────────────

  async fn ingest_batch(&self, batch: MeasurementBatch) -> Result<IngestReport> {
    let ingest_id = Uuid::new_v4();
    let started_at = Utc::now();

    // Batch-level shape failure: log it and report Error without touching
    // any measurement table.
    if let Err(e) = batch.validate_shape() {
      let record = self
        .write_ingest_log(
          ingest_id,
          started_at,
          IngestStatus::Error,
          0,
          0,
          Some(e.to_string()),
        )
        .await?;
      tracing::warn!(batch = %ingest_id, error = %e, "rejected malformed batch");
      return Ok(IngestReport {
        record,
        alerts_fired: 0,
        failures: vec![MemberFailure { region_id: None, reason: e.to_string() }],
      });
    }

    // Expand features into records; parse/validation failures are rejected
    // before any write.
    let mut members: Vec<NewMeasurement> = Vec::new();
    let mut failures: Vec<MemberFailure> = Vec::new();
    for feature in &batch.features {
      match feature.to_measurements(batch.recorded_at) {
        Ok(records) => {
          for m in records {
            match m.validate() {
              Ok(()) => members.push(m),
              Err(e) => failures.push(MemberFailure {
                region_id: Some(m.region_id.clone()),
                reason:    e.to_string(),
              }),
            }
          }
        }
        Err(e) => failures.push(MemberFailure {
          region_id: feature.properties.region_id.clone(),
          reason:    e.to_string(),
        }),
      }
    }

    // Run all member transactions on the connection thread, serially.
    let now = started_at;
    let outcomes: Vec<MemberOut> = self
      .conn
      .call(move |conn| {
        let mut outcomes = Vec::with_capacity(members.len());
        for m in members {
          let out = match ingest_member(conn, &m, now) {
            Ok(MemberDbOutcome::Committed(events)) => {
              MemberOut::Committed { events }
            }
            Ok(MemberDbOutcome::UnknownRegion) => MemberOut::Failed {
              region_id: m.region_id,
              reason:    "region not found".to_owned(),
            },
            Err(e) => MemberOut::Failed {
              region_id: m.region_id,
              reason:    e.to_string(),
            },
          };
          outcomes.push(out);
        }
        Ok(outcomes)
      })
      .await?;

    let mut accepted: u32 = 0;
    let mut alerts_fired: u32 = 0;
    for out in outcomes {
      match out {
        MemberOut::Committed { events, .. } => {
          accepted += 1;
          alerts_fired += events.len() as u32;
        }
        MemberOut::Failed { region_id, reason } => {
          failures.push(MemberFailure { region_id: Some(region_id), reason });
        }
      }
    }
    let rejected = failures.len() as u32;

    let message = if rejected == 0 {
      None
    } else {
      Some(format!(
        "{rejected} of {} records rejected",
        accepted + rejected
      ))
    };
    let record = self
      .write_ingest_log(
        ingest_id,
        started_at,
        IngestStatus::from_counts(accepted, rejected),
        accepted,
        rejected,
        message,
      )
      .await?;

    match record.status {
      IngestStatus::Success => tracing::info!(
        batch = %ingest_id, accepted, alerts_fired, "ingested batch"
      ),
      _ => tracing::warn!(
        batch = %ingest_id, accepted, rejected, alerts_fired,
        "ingested batch with rejections"
      ),
    }

    Ok(IngestReport { record, alerts_fired, failures })
  }

  async fn upsert_measurement(
    &self,
    input: NewMeasurement,
  ) -> Result<(Measurement, Vec<AlertEvent>)> {
    input.validate().map_err(Error::Core)?;

    let now = Utc::now();
    let m = input.clone();
    let outcome: MemberDbOutcome = self
      .conn
      .call(move |conn| Ok(ingest_member(conn, &m, now)?))
      .await?;

    let raw_events = match outcome {
      MemberDbOutcome::Committed(events) => events,
      MemberDbOutcome::UnknownRegion => {
        return Err(Error::RegionNotFound(input.region_id));
      }
    };

    let measurement = Measurement {
      recorded_at:    input.recorded_at,
      region_id:      input.region_id,
      source:         input.source,
      raw_value:      input.raw_value,
      normalized:     input.normalized,
      classification: input.classification,
      ingested_at:    now,
    };
    let events = raw_events
      .into_iter()
      .map(RawAlertEvent::into_event)
      .collect::<Result<Vec<_>>>()?;

    Ok((measurement, events))
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn latest_measurements(
    &self,
    region_id: Option<String>,
  ) -> Result<Vec<Measurement>> {
    let raws: Vec<RawMeasurement> = self
      .conn
      .call(move |conn| {
        let sql_all =
          "SELECT recorded_at, region_id, source, raw_value, normalized,
                  classification, ingested_at
           FROM current_measurements ORDER BY region_id, source";
        let sql_one =
          "SELECT recorded_at, region_id, source, raw_value, normalized,
                  classification, ingested_at
           FROM current_measurements WHERE region_id = ?1
           ORDER BY source";

        let map = |row: &rusqlite::Row<'_>| {
          Ok(RawMeasurement {
            recorded_at:    row.get(0)?,
            region_id:      row.get(1)?,
            source:         row.get(2)?,
            raw_value:      row.get(3)?,
            normalized:     row.get(4)?,
            classification: row.get(5)?,
            ingested_at:    row.get(6)?,
          })
        };

        let rows = if let Some(id) = region_id {
          let mut stmt = conn.prepare(sql_one)?;
          let rows = stmt
            .query_map(rusqlite::params![id], map)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows
        } else {
          let mut stmt = conn.prepare(sql_all)?;
          let rows = stmt
            .query_map([], map)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows
        };
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawMeasurement::into_measurement)
      .collect()
  }

  async fn get_daily_aggregate(
    &self,
    day: NaiveDate,
    region_id: &str,
    source: EnergySource,
  ) -> Result<Option<DailyAggregate>> {
    let day_str = encode_day(day);
    let id_str = region_id.to_owned();
    let source_str = encode_source(source).to_owned();

    let raw: Option<RawDailyAggregate> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT day, region_id, source, sample_count, mean, min, max,
                      stddev, p50, p90, computed_at
               FROM daily_aggregates
               WHERE day = ?1 AND region_id = ?2 AND source = ?3",
              rusqlite::params![day_str, id_str, source_str],
              daily_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDailyAggregate::into_aggregate).transpose()
  }

  async fn list_daily_aggregates(
    &self,
    day: NaiveDate,
    source: Option<EnergySource>,
  ) -> Result<Vec<DailyAggregate>> {
    let day_str = encode_day(day);
    let source_str = source.map(encode_source).map(str::to_owned);

    let raws: Vec<RawDailyAggregate> = self
      .conn
      .call(move |conn| {
        let sql = if source_str.is_some() {
          "SELECT day, region_id, source, sample_count, mean, min, max,
                  stddev, p50, p90, computed_at
           FROM daily_aggregates
           WHERE day = ?1 AND source = ?2 ORDER BY region_id"
        } else {
          "SELECT day, region_id, source, sample_count, mean, min, max,
                  stddev, p50, p90, computed_at
           FROM daily_aggregates
           WHERE day = ?1 AND (?2 IS NULL) ORDER BY region_id, source"
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
          .query_map(rusqlite::params![day_str, source_str], daily_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawDailyAggregate::into_aggregate)
      .collect()
  }

  async fn get_monthly_aggregate(
    &self,
    year: i32,
    month: u32,
    region_id: &str,
    source: EnergySource,
  ) -> Result<Option<MonthlyAggregate>> {
    let id_str = region_id.to_owned();
    let source_str = encode_source(source).to_owned();

    let raw: Option<RawMonthlyAggregate> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT year, month, region_id, source, sample_count, mean,
                      min, max, stddev, p50, p90, computed_at
               FROM monthly_aggregates
               WHERE year = ?1 AND month = ?2
                 AND region_id = ?3 AND source = ?4",
              rusqlite::params![year, month, id_str, source_str],
              |row| {
                Ok(RawMonthlyAggregate {
                  year:        row.get(0)?,
                  month:       row.get(1)?,
                  region_id:   row.get(2)?,
                  source:      row.get(3)?,
                  stats:       RawRollup {
                    sample_count: row.get(4)?,
                    mean:         row.get(5)?,
                    min:          row.get(6)?,
                    max:          row.get(7)?,
                    stddev:       row.get(8)?,
                    p50:          row.get(9)?,
                    p90:          row.get(10)?,
                  },
                  computed_at: row.get(11)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMonthlyAggregate::into_aggregate).transpose()
  }

  async fn region_summaries(
    &self,
    day: NaiveDate,
    source: EnergySource,
  ) -> Result<RegionSummaryReport> {
    let day_str = encode_day(day);
    let source_str = encode_source(source).to_owned();

    type RawPair = (RawRegion, Option<RawDailyAggregate>);
    let raws: Vec<RawPair> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT r.region_id, r.name, r.boundary, r.properties, r.created_at,
                  a.day, a.source, a.sample_count, a.mean, a.min, a.max,
                  a.stddev, a.p50, a.p90, a.computed_at
           FROM regions r
           LEFT JOIN daily_aggregates a
             ON a.region_id = r.region_id
            AND a.day = ?1 AND a.source = ?2
           ORDER BY r.region_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![day_str, source_str], |row| {
            let region = RawRegion {
              region_id:  row.get(0)?,
              name:       row.get(1)?,
              boundary:   row.get(2)?,
              properties: row.get(3)?,
              created_at: row.get(4)?,
            };
            let agg_day: Option<String> = row.get(5)?;
            let aggregate = match agg_day {
              Some(day) => Some(RawDailyAggregate {
                day,
                region_id: region.region_id.clone(),
                source: row.get(6)?,
                stats: RawRollup {
                  sample_count: row.get(7)?,
                  mean:         row.get(8)?,
                  min:          row.get(9)?,
                  max:          row.get(10)?,
                  stddev:       row.get(11)?,
                  p50:          row.get(12)?,
                  p90:          row.get(13)?,
                },
                computed_at: row.get(14)?,
              }),
              None => None,
            };
            Ok((region, aggregate))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut regions = Vec::with_capacity(raws.len());
    for (raw_region, raw_agg) in raws {
      regions.push(RegionSummary {
        region:    raw_region.into_region()?,
        aggregate: raw_agg
          .map(RawDailyAggregate::into_aggregate)
          .transpose()?,
      });
    }

    let ranked = |pick_max: bool| -> Option<String> {
      let mut with_stats = regions
        .iter()
        .filter_map(|s| {
          s.aggregate
            .as_ref()
            .map(|a| (s.region.region_id.clone(), a.stats.mean))
        })
        .collect::<Vec<_>>();
      with_stats.sort_by(|a, b| a.1.total_cmp(&b.1));
      if pick_max {
        with_stats.last().map(|(id, _)| id.clone())
      } else {
        with_stats.first().map(|(id, _)| id.clone())
      }
    };

    Ok(RegionSummaryReport {
      day,
      source,
      best: ranked(true),
      worst: ranked(false),
      regions,
    })
  }

  // ── Alerting ──────────────────────────────────────────────────────────────

  async fn add_alert_rule(&self, input: NewAlertRule) -> Result<AlertRule> {
    let rule = AlertRule {
      rule_id:       Uuid::new_v4(),
      name:          input.name,
      source:        input.source,
      threshold:     input.threshold,
      severity:      input.severity,
      enabled:       input.enabled,
      notify:        input.notify,
      suppress_secs: input.suppress_secs,
      created_at:    Utc::now(),
    };

    let id_str = encode_uuid(rule.rule_id);
    let name = rule.name.clone();
    let source_str = encode_source(rule.source).to_owned();
    let threshold = rule.threshold;
    let severity_str = encode_severity(rule.severity).to_owned();
    let enabled = rule.enabled;
    let notify_str = encode_notify(&rule.notify)?;
    let suppress = rule.suppress_secs as i64;
    let created_at_str = encode_dt(rule.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO alert_rules (
             rule_id, name, source, threshold, severity,
             enabled, notify, suppress_secs, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str, name, source_str, threshold, severity_str,
            enabled, notify_str, suppress, created_at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(rule)
  }

  async fn list_alert_rules(&self, only_enabled: bool) -> Result<Vec<AlertRule>> {
    let raws: Vec<RawAlertRule> = self
      .conn
      .call(move |conn| {
        let sql = if only_enabled {
          "SELECT rule_id, name, source, threshold, severity, enabled,
                  notify, suppress_secs, created_at
           FROM alert_rules WHERE enabled = 1 ORDER BY name"
        } else {
          "SELECT rule_id, name, source, threshold, severity, enabled,
                  notify, suppress_secs, created_at
           FROM alert_rules ORDER BY name"
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
          .query_map([], rule_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAlertRule::into_rule).collect()
  }

  async fn set_rule_enabled(
    &self,
    rule_id: Uuid,
    enabled: bool,
  ) -> Result<AlertRule> {
    let id_str = encode_uuid(rule_id);

    let raw: Option<RawAlertRule> = self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE alert_rules SET enabled = ?2 WHERE rule_id = ?1",
          rusqlite::params![id_str, enabled],
        )?;
        Ok(
          conn
            .query_row(
              "SELECT rule_id, name, source, threshold, severity, enabled,
                      notify, suppress_secs, created_at
               FROM alert_rules WHERE rule_id = ?1",
              rusqlite::params![id_str],
              rule_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .ok_or(Error::RuleNotFound(rule_id))?
      .into_rule()
  }

  async fn list_alert_events(
    &self,
    query: AlertEventQuery,
  ) -> Result<Vec<AlertEvent>> {
    let state_str = query.state.map(encode_state).map(str::to_owned);
    let rule_str = query.rule_id.map(encode_uuid);
    let region_str = query.region_id;
    let after_str = query.fired_after.map(encode_dt);
    let limit_val = query.limit.unwrap_or(100) as i64;

    let raws: Vec<RawAlertEvent> = self
      .conn
      .call(move |conn| {
        // Build WHERE clause dynamically; placeholders keep fixed indices.
        let mut conds: Vec<&'static str> = vec![];
        if state_str.is_some() {
          conds.push("state = ?1");
        }
        if rule_str.is_some() {
          conds.push("rule_id = ?2");
        }
        if region_str.is_some() {
          conds.push("region_id = ?3");
        }
        if after_str.is_some() {
          conds.push("fired_at >= ?4");
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let sql = format!(
          "SELECT event_id, rule_id, region_id, source, recorded_at,
                  current_value, threshold_value, severity,
                  state, fired_at, state_changed_at
           FROM alert_events
           {where_clause}
           ORDER BY fired_at DESC, event_id
           LIMIT ?5"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              state_str.as_deref(),
              rule_str.as_deref(),
              region_str.as_deref(),
              after_str.as_deref(),
              limit_val,
            ],
            event_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAlertEvent::into_event).collect()
  }

  async fn acknowledge_alert(&self, event_id: Uuid) -> Result<AlertEvent> {
    self.transition_alert(event_id, AlertState::Acknowledged).await
  }

  async fn resolve_alert(&self, event_id: Uuid) -> Result<AlertEvent> {
    self.transition_alert(event_id, AlertState::Resolved).await
  }

  // ── Quality log ───────────────────────────────────────────────────────────

  async fn list_ingest_log(&self, limit: usize) -> Result<Vec<IngestRecord>> {
    let limit_val = limit as i64;

    let raws: Vec<RawIngestRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT ingest_id, started_at, status, accepted, rejected, message
           FROM ingest_log ORDER BY started_at DESC, ingest_id LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit_val], |row| {
            Ok(RawIngestRecord {
              ingest_id:  row.get(0)?,
              started_at: row.get(1)?,
              status:     row.get(2)?,
              accepted:   row.get(3)?,
              rejected:   row.get(4)?,
              message:    row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawIngestRecord::into_record)
      .collect()
  }
}

// ─── Private helpers ─────────────────────────────────────────────────────────

impl SqliteStore {
  /// Persist the whole-batch quality-log row and return it as committed.
  ///
  /// The status is the caller's: record counts alone cannot distinguish an
  /// empty successful batch from a batch-level failure.
  async fn write_ingest_log(
    &self,
    ingest_id: Uuid,
    started_at: DateTime<Utc>,
    status: IngestStatus,
    accepted: u32,
    rejected: u32,
    message: Option<String>,
  ) -> Result<IngestRecord> {
    let record = IngestRecord {
      ingest_id,
      started_at,
      status,
      accepted,
      rejected,
      message,
    };

    let id_str = encode_uuid(record.ingest_id);
    let at_str = encode_dt(record.started_at);
    let status_str = encode_status(record.status).to_owned();
    let message = record.message.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO ingest_log (
             ingest_id, started_at, status, accepted, rejected, message
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            id_str, at_str, status_str,
            accepted as i64, rejected as i64, message,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(record)
  }

  /// Load an event, check the transition is legal, and persist it — all
  /// inside one transaction, so concurrent transitions cannot interleave
  /// between the check and the write.
  async fn transition_alert(
    &self,
    event_id: Uuid,
    to: AlertState,
  ) -> Result<AlertEvent> {
    let id_str = encode_uuid(event_id);
    let to_str = encode_state(to).to_owned();
    let now_str = encode_dt(Utc::now());

    let raw: Option<(RawAlertEvent, bool)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(mut raw) = tx
          .query_row(
            "SELECT event_id, rule_id, region_id, source, recorded_at,
                    current_value, threshold_value, severity,
                    state, fired_at, state_changed_at
             FROM alert_events WHERE event_id = ?1",
            rusqlite::params![id_str],
            event_row,
          )
          .optional()?
        else {
          return Ok(None);
        };

        let legal = decode_state(&raw.state)
          .map(|from| from.transition(to).is_ok())
          .unwrap_or(false);
        if legal {
          tx.execute(
            "UPDATE alert_events SET state = ?2, state_changed_at = ?3
             WHERE event_id = ?1",
            rusqlite::params![raw.event_id, to_str, now_str],
          )?;
          raw.state = to_str;
          raw.state_changed_at = now_str;
        }
        tx.commit()?;
        Ok(Some((raw, legal)))
      })
      .await?;

    let (raw, updated) = raw.ok_or(Error::EventNotFound(event_id))?;
    let event = raw.into_event()?;
    if !updated {
      return Err(Error::Core(enerscore_core::Error::IllegalTransition {
        from: event.state,
        to,
      }));
    }
    Ok(event)
  }
}

// ─── Row mappers ─────────────────────────────────────────────────────────────

fn daily_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawDailyAggregate> {
  Ok(RawDailyAggregate {
    day:         row.get(0)?,
    region_id:   row.get(1)?,
    source:      row.get(2)?,
    stats:       RawRollup {
      sample_count: row.get(3)?,
      mean:         row.get(4)?,
      min:          row.get(5)?,
      max:          row.get(6)?,
      stddev:       row.get(7)?,
      p50:          row.get(8)?,
      p90:          row.get(9)?,
    },
    computed_at: row.get(10)?,
  })
}

fn rule_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAlertRule> {
  Ok(RawAlertRule {
    rule_id:       row.get(0)?,
    name:          row.get(1)?,
    source:        row.get(2)?,
    threshold:     row.get(3)?,
    severity:      row.get(4)?,
    enabled:       row.get(5)?,
    notify:        row.get(6)?,
    suppress_secs: row.get(7)?,
    created_at:    row.get(8)?,
  })
}

fn event_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAlertEvent> {
  Ok(RawAlertEvent {
    event_id:         row.get(0)?,
    rule_id:          row.get(1)?,
    region_id:        row.get(2)?,
    source:           row.get(3)?,
    recorded_at:      row.get(4)?,
    current_value:    row.get(5)?,
    threshold_value:  row.get(6)?,
    severity:         row.get(7)?,
    state:            row.get(8)?,
    fired_at:         row.get(9)?,
    state_changed_at: row.get(10)?,
  })
}
