//! Error types for `enerscore-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::alert::AlertState;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown region: {0:?}")]
  UnknownRegion(String),

  #[error("unknown energy source: {0:?}")]
  UnknownSource(String),

  #[error("normalized value {0} is outside [0, 1]")]
  NormalizedOutOfRange(f64),

  // The field is deliberately not called `source`: thiserror would treat
  // that as the error's cause.
  #[error("raw value {value} is outside the valid range for {source_name}")]
  RawOutOfRange { source_name: &'static str, value: f64 },

  #[error("missing required field: {0}")]
  MissingField(&'static str),

  #[error("expected a {expected:?} object, got {got:?}")]
  UnexpectedShape { expected: &'static str, got: String },

  #[error("alert rule not found: {0}")]
  RuleNotFound(Uuid),

  #[error("alert event not found: {0}")]
  EventNotFound(Uuid),

  #[error("illegal alert state transition: {from:?} -> {to:?}")]
  IllegalTransition { from: AlertState, to: AlertState },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
