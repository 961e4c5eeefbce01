//! The ingestion quality log.
//!
//! One record per ingested batch — the whole batch outcome, not per-record
//! outcomes. Per-record failures are returned to the caller in the
//! [`IngestReport`] but never persisted individually.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Status ──────────────────────────────────────────────────────────────────

/// Outcome of a whole batch.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IngestStatus {
  /// Every record was accepted.
  Success,
  /// Some records were rejected; the rest committed.
  Warning,
  /// No record was accepted, or the batch itself was malformed.
  Error,
}

impl IngestStatus {
  /// Derive the batch status from record counts.
  pub fn from_counts(accepted: u32, rejected: u32) -> Self {
    match (accepted, rejected) {
      (_, 0) => Self::Success,
      (0, _) => Self::Error,
      _ => Self::Warning,
    }
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A persisted quality-log row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRecord {
  pub ingest_id:  Uuid,
  pub started_at: DateTime<Utc>,
  pub status:     IngestStatus,
  pub accepted:   u32,
  pub rejected:   u32,
  pub message:    Option<String>,
}

/// A per-record failure, reported to the caller only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberFailure {
  /// Region of the failed record, when it could be determined.
  pub region_id: Option<String>,
  pub reason:    String,
}

/// What [`crate::store::SuitabilityStore::ingest_batch`] returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
  pub record:       IngestRecord,
  /// Total alert events fired across all accepted records.
  pub alerts_fired: u32,
  pub failures:     Vec<MemberFailure>,
}
