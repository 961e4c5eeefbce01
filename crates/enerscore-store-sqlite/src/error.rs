//! Error type for `enerscore-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] enerscore_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored discriminant column held an unrecognised value.
  #[error("column decode error: {0}")]
  Decode(String),

  /// A write referenced a region that has not been provisioned.
  #[error("region not found: {0:?}")]
  RegionNotFound(String),

  #[error("alert rule not found: {0}")]
  RuleNotFound(uuid::Uuid),

  #[error("alert event not found: {0}")]
  EventNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
