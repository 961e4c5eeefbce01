//! Region — the administrative unit measurements are keyed by.
//!
//! A region holds identity metadata and a GeoJSON boundary. Regions are
//! created once at provisioning time and rarely updated; writes use upsert
//! semantics keyed by the region id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An administrative region (e.g. a Nigerian state).
///
/// The boundary is a GeoJSON geometry stored verbatim; the store never
/// interprets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
  /// Stable slug identifier, e.g. `"NG-LA"` for Lagos.
  pub region_id:  String,
  pub name:       String,
  /// GeoJSON geometry object, if known.
  pub boundary:   Option<serde_json::Value>,
  /// Free-form descriptive metadata.
  pub properties: serde_json::Value,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::SuitabilityStore::upsert_region`].
/// `created_at` is set by the store on first insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRegion {
  pub region_id:  String,
  pub name:       String,
  #[serde(default)]
  pub boundary:   Option<serde_json::Value>,
  #[serde(default = "default_properties")]
  pub properties: serde_json::Value,
}

fn default_properties() -> serde_json::Value {
  serde_json::Value::Object(Default::default())
}

impl NewRegion {
  /// Convenience constructor with no boundary and empty properties.
  pub fn new(region_id: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      region_id:  region_id.into(),
      name:       name.into(),
      boundary:   None,
      properties: default_properties(),
    }
  }
}
