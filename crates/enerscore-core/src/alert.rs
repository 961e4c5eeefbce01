//! Alert rules and the events they fire.
//!
//! A rule is a scalar threshold over one source. Rules are evaluated inside
//! the same transaction as the measurement insert that triggers them; each
//! rule fires independently, so one measurement may produce zero, one, or
//! many events. Events are append-only — only their state ever changes, via
//! the explicit transition operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  measurement::{EnergySource, NewMeasurement},
};

// ─── Severity ────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
  Info,
  Warning,
  Critical,
}

// ─── AlertRule ───────────────────────────────────────────────────────────────

/// A threshold condition over one energy source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
  pub rule_id:       Uuid,
  pub name:          String,
  pub source:        EnergySource,
  /// Fires when a measurement's normalized value is strictly greater.
  pub threshold:     f64,
  pub severity:      Severity,
  pub enabled:       bool,
  /// Notification targets, interpreted by downstream delivery tooling.
  pub notify:        Vec<String>,
  /// Re-fire suppression window per (rule, region), in seconds.
  /// 0 disables suppression: every breach fires.
  pub suppress_secs: u32,
  pub created_at:    DateTime<Utc>,
}

impl AlertRule {
  /// Whether this rule fires for `m`. Disabled rules and other sources never
  /// match; a value at or below the threshold never fires.
  pub fn matches(&self, m: &NewMeasurement) -> bool {
    self.enabled && self.source == m.source && m.normalized > self.threshold
  }
}

/// Input to [`crate::store::SuitabilityStore::add_alert_rule`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAlertRule {
  pub name:          String,
  pub source:        EnergySource,
  pub threshold:     f64,
  pub severity:      Severity,
  #[serde(default = "default_enabled")]
  pub enabled:       bool,
  #[serde(default)]
  pub notify:        Vec<String>,
  #[serde(default)]
  pub suppress_secs: u32,
}

fn default_enabled() -> bool {
  true
}

impl NewAlertRule {
  pub fn new(
    name: impl Into<String>,
    source: EnergySource,
    threshold: f64,
    severity: Severity,
  ) -> Self {
    Self {
      name: name.into(),
      source,
      threshold,
      severity,
      enabled: true,
      notify: Vec::new(),
      suppress_secs: 0,
    }
  }
}

// ─── AlertState ──────────────────────────────────────────────────────────────

/// Lifecycle state of an alert event, transitioned externally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
  Active,
  Acknowledged,
  Resolved,
}

impl AlertState {
  /// Legal transitions: Active→Acknowledged, Active→Resolved,
  /// Acknowledged→Resolved.
  pub fn transition(self, to: AlertState) -> Result<AlertState> {
    let legal = matches!(
      (self, to),
      (AlertState::Active, AlertState::Acknowledged)
        | (AlertState::Active, AlertState::Resolved)
        | (AlertState::Acknowledged, AlertState::Resolved)
    );
    if legal {
      Ok(to)
    } else {
      Err(Error::IllegalTransition { from: self, to })
    }
  }
}

// ─── AlertEvent ──────────────────────────────────────────────────────────────

/// One firing of a rule against a specific measurement.
///
/// `current_value` and `threshold_value` are recorded verbatim at firing
/// time, so later rule edits do not rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
  pub event_id:         Uuid,
  pub rule_id:          Uuid,
  pub region_id:        String,
  pub source:           EnergySource,
  /// Timestamp of the triggering measurement.
  pub recorded_at:      DateTime<Utc>,
  pub current_value:    f64,
  pub threshold_value:  f64,
  pub severity:         Severity,
  pub state:            AlertState,
  pub fired_at:         DateTime<Utc>,
  pub state_changed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn rule(source: EnergySource, threshold: f64) -> AlertRule {
    AlertRule {
      rule_id: Uuid::new_v4(),
      name: "high solar".into(),
      source,
      threshold,
      severity: Severity::Warning,
      enabled: true,
      notify: vec!["ops@example.org".into()],
      suppress_secs: 0,
      created_at: Utc::now(),
    }
  }

  fn measurement(source: EnergySource, normalized: f64) -> NewMeasurement {
    NewMeasurement::new(
      Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap(),
      "NG-LA",
      source,
      normalized * 5.0,
      normalized,
    )
  }

  #[test]
  fn fires_strictly_above_threshold() {
    let r = rule(EnergySource::Solar, 0.76);
    assert!(r.matches(&measurement(EnergySource::Solar, 0.78)));
  }

  #[test]
  fn at_threshold_does_not_fire() {
    let r = rule(EnergySource::Solar, 0.76);
    assert!(!r.matches(&measurement(EnergySource::Solar, 0.76)));
  }

  #[test]
  fn below_threshold_does_not_fire() {
    let r = rule(EnergySource::Solar, 0.76);
    assert!(!r.matches(&measurement(EnergySource::Solar, 0.5)));
  }

  #[test]
  fn other_source_does_not_fire() {
    let r = rule(EnergySource::Solar, 0.5);
    assert!(!r.matches(&measurement(EnergySource::Wind, 0.9)));
  }

  #[test]
  fn disabled_rule_does_not_fire() {
    let mut r = rule(EnergySource::Solar, 0.5);
    r.enabled = false;
    assert!(!r.matches(&measurement(EnergySource::Solar, 0.9)));
  }

  #[test]
  fn transitions() {
    use AlertState::*;
    assert_eq!(Active.transition(Acknowledged).unwrap(), Acknowledged);
    assert_eq!(Active.transition(Resolved).unwrap(), Resolved);
    assert_eq!(Acknowledged.transition(Resolved).unwrap(), Resolved);

    assert!(Resolved.transition(Active).is_err());
    assert!(Resolved.transition(Acknowledged).is_err());
    assert!(Acknowledged.transition(Active).is_err());
    assert!(Active.transition(Active).is_err());
  }
}
