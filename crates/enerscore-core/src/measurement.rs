//! Measurement types — the fundamental unit of the enerscore store.
//!
//! A measurement is one suitability reading for a (timestamp, region,
//! source) key. The key is the primary key: a later write at the same key
//! overwrites in place (upsert). Measurements are never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::{Error, Result};

// ─── EnergySource ────────────────────────────────────────────────────────────

/// The closed set of energy sources a suitability score can describe.
///
/// `Composite` is the weighted combination of the three physical sources,
/// computed upstream; the store treats it as just another source.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EnergySource {
  Solar,
  Wind,
  Hydro,
  Composite,
}

impl EnergySource {
  /// The unit the raw value is reported in.
  pub fn unit(self) -> &'static str {
    match self {
      Self::Solar => "kWh/m2/day",
      Self::Wind => "m/s",
      Self::Hydro => "mm/day",
      Self::Composite => "score",
    }
  }

  /// The plausible range for raw values of this source. Values outside the
  /// range are rejected before any write.
  pub fn valid_range(self) -> RangeInclusive<f64> {
    match self {
      // Global horizontal irradiance; 8 kWh/m2/day is above any terrestrial
      // site.
      Self::Solar => 0.0..=8.0,
      // 10 m wind speed; 40 m/s is hurricane territory.
      Self::Wind => 0.0..=40.0,
      // Daily runoff-relevant precipitation.
      Self::Hydro => 0.0..=500.0,
      Self::Composite => 0.0..=1.0,
    }
  }

  /// The discriminant string stored in the `source` column.
  /// Must match the `rename_all = "lowercase"` serde tags above.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Solar => "solar",
      Self::Wind => "wind",
      Self::Hydro => "hydro",
      Self::Composite => "composite",
    }
  }
}

// ─── NewMeasurement ──────────────────────────────────────────────────────────

/// Input to [`crate::store::SuitabilityStore::upsert_measurement`].
/// `ingested_at` is always set by the store; it is not accepted from callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMeasurement {
  pub recorded_at:    DateTime<Utc>,
  pub region_id:      String,
  pub source:         EnergySource,
  pub raw_value:      f64,
  /// Rescaled to `[0, 1]` for cross-source comparison.
  pub normalized:     f64,
  /// Arbitrary classification metadata (e.g. suitability class labels).
  #[serde(default)]
  pub classification: serde_json::Value,
}

impl NewMeasurement {
  pub fn new(
    recorded_at: DateTime<Utc>,
    region_id: impl Into<String>,
    source: EnergySource,
    raw_value: f64,
    normalized: f64,
  ) -> Self {
    Self {
      recorded_at,
      region_id: region_id.into(),
      source,
      raw_value,
      normalized,
      classification: serde_json::Value::Null,
    }
  }

  /// Range checks applied before any write.
  pub fn validate(&self) -> Result<()> {
    if !(0.0..=1.0).contains(&self.normalized) || !self.normalized.is_finite()
    {
      return Err(Error::NormalizedOutOfRange(self.normalized));
    }
    if !self.source.valid_range().contains(&self.raw_value)
      || !self.raw_value.is_finite()
    {
      return Err(Error::RawOutOfRange {
        source_name: self.source.as_str(),
        value:       self.raw_value,
      });
    }
    Ok(())
  }
}

// ─── Measurement ─────────────────────────────────────────────────────────────

/// A committed measurement. Immutable except via an explicit upsert at the
/// same (recorded_at, region_id, source) key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
  pub recorded_at:    DateTime<Utc>,
  pub region_id:      String,
  pub source:         EnergySource,
  pub raw_value:      f64,
  pub normalized:     f64,
  pub classification: serde_json::Value,
  /// Server-assigned; updated on every upsert at this key.
  pub ingested_at:    DateTime<Utc>,
}
