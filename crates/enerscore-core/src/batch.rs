//! GeoJSON-shaped ingestion batches.
//!
//! One batch covers one timestamp: a `FeatureCollection` with one feature
//! per region, whose properties carry per-source readings. Parsing and
//! field-presence validation happen here, before any write; range
//! validation is applied per record by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  measurement::{EnergySource, NewMeasurement},
};

// ─── Wire types ──────────────────────────────────────────────────────────────

/// One per-source reading inside a feature's properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReading {
  /// Raw value in the source's own unit. Defaults to the normalized value
  /// for sources reported pre-normalized (composite).
  pub raw:            Option<f64>,
  pub normalized:     f64,
  #[serde(default)]
  pub classification: serde_json::Value,
}

/// Properties of one region feature. `region_id` is required; at least one
/// source reading must be present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureProperties {
  pub region_id: Option<String>,
  pub solar:     Option<SourceReading>,
  pub wind:      Option<SourceReading>,
  pub hydro:     Option<SourceReading>,
  pub composite: Option<SourceReading>,
}

/// One GeoJSON feature: a region plus its readings for the batch timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionFeature {
  #[serde(rename = "type")]
  pub kind:       String,
  /// Boundary geometry; carried through but not required for ingestion.
  #[serde(default)]
  pub geometry:   Option<serde_json::Value>,
  pub properties: FeatureProperties,
}

/// A full ingestion batch: a `FeatureCollection` stamped with the
/// measurement timestamp shared by every record in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementBatch {
  #[serde(rename = "type")]
  pub kind:        String,
  pub recorded_at: DateTime<Utc>,
  pub features:    Vec<RegionFeature>,
}

// ─── Conversion ──────────────────────────────────────────────────────────────

impl MeasurementBatch {
  /// Check the GeoJSON type tag. Deserialization alone accepts any string.
  pub fn validate_shape(&self) -> Result<()> {
    if self.kind != "FeatureCollection" {
      return Err(Error::UnexpectedShape {
        expected: "FeatureCollection",
        got:      self.kind.clone(),
      });
    }
    Ok(())
  }
}

impl RegionFeature {
  /// Expand this feature into one [`NewMeasurement`] per present source.
  ///
  /// Fails, without producing any record, if the feature is malformed:
  /// wrong type tag, missing `region_id`, or no source readings at all.
  pub fn to_measurements(
    &self,
    recorded_at: DateTime<Utc>,
  ) -> Result<Vec<NewMeasurement>> {
    if self.kind != "Feature" {
      return Err(Error::UnexpectedShape {
        expected: "Feature",
        got:      self.kind.clone(),
      });
    }
    let region_id = self
      .properties
      .region_id
      .as_deref()
      .ok_or(Error::MissingField("region_id"))?;

    let sources = [
      (EnergySource::Solar, &self.properties.solar),
      (EnergySource::Wind, &self.properties.wind),
      (EnergySource::Hydro, &self.properties.hydro),
      (EnergySource::Composite, &self.properties.composite),
    ];

    let mut records = Vec::new();
    for (source, reading) in sources {
      if let Some(r) = reading {
        records.push(NewMeasurement {
          recorded_at,
          region_id: region_id.to_owned(),
          source,
          raw_value: r.raw.unwrap_or(r.normalized),
          normalized: r.normalized,
          classification: r.classification.clone(),
        });
      }
    }

    if records.is_empty() {
      return Err(Error::MissingField("at least one source reading"));
    }
    Ok(records)
  }
}
