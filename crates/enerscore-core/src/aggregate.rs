//! Derived rollups over normalized measurement values.
//!
//! Aggregates are recomputed synchronously inside the transaction that
//! inserts a measurement into their period, so they are never stale relative
//! to committed measurements. The math lives here as pure functions; the
//! store only decides *when* to recompute.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::measurement::EnergySource;

// ─── Rollup ──────────────────────────────────────────────────────────────────

/// Summary statistics over a set of normalized values.
///
/// `stddev` is the sample standard deviation (n − 1 denominator) and is
/// absent for a single value. Percentiles interpolate linearly between
/// closest ranks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rollup {
  pub count:  u64,
  pub mean:   f64,
  pub min:    f64,
  pub max:    f64,
  pub stddev: Option<f64>,
  pub p50:    f64,
  pub p90:    f64,
}

impl Rollup {
  /// Compute a rollup over `values`. Returns `None` for an empty slice.
  pub fn from_values(values: &[f64]) -> Option<Self> {
    if values.is_empty() {
      return None;
    }

    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let stddev = if count > 1 {
      let ss = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
      Some((ss / (count - 1) as f64).sqrt())
    } else {
      None
    };

    Some(Self {
      count: count as u64,
      mean,
      min: sorted[0],
      max: sorted[count - 1],
      stddev,
      p50: percentile(&sorted, 0.5),
      p90: percentile(&sorted, 0.9),
    })
  }
}

/// Linear-interpolation percentile over an already-sorted slice.
/// `q` is a fraction in `[0, 1]`.
fn percentile(sorted: &[f64], q: f64) -> f64 {
  let rank = q * (sorted.len() - 1) as f64;
  let lo = rank.floor() as usize;
  let hi = rank.ceil() as usize;
  if lo == hi {
    return sorted[lo];
  }
  let weight = rank - lo as f64;
  sorted[lo] * (1.0 - weight) + sorted[hi] * weight
}

// ─── Aggregate records ───────────────────────────────────────────────────────

/// The day rollup for a (day, region, source) key. Exactly one row per key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyAggregate {
  pub day:         NaiveDate,
  pub region_id:   String,
  pub source:      EnergySource,
  pub stats:       Rollup,
  pub computed_at: DateTime<Utc>,
}

/// The month rollup for a (year, month, region, source) key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyAggregate {
  pub year:        i32,
  pub month:       u32,
  pub region_id:   String,
  pub source:      EnergySource,
  pub stats:       Rollup,
  pub computed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_yields_none() {
    assert!(Rollup::from_values(&[]).is_none());
  }

  #[test]
  fn mean_of_three() {
    let r = Rollup::from_values(&[0.2, 0.4, 0.6]).unwrap();
    assert!((r.mean - 0.4).abs() < 1e-12);
    assert_eq!(r.count, 3);
    assert_eq!(r.min, 0.2);
    assert_eq!(r.max, 0.6);
  }

  #[test]
  fn single_value_has_no_stddev() {
    let r = Rollup::from_values(&[0.7]).unwrap();
    assert_eq!(r.stddev, None);
    assert_eq!(r.mean, 0.7);
    assert_eq!(r.p50, 0.7);
    assert_eq!(r.p90, 0.7);
  }

  #[test]
  fn sample_stddev() {
    // Sample stddev of [0.2, 0.4, 0.6] is 0.2.
    let r = Rollup::from_values(&[0.2, 0.4, 0.6]).unwrap();
    assert!((r.stddev.unwrap() - 0.2).abs() < 1e-12);
  }

  #[test]
  fn median_interpolates_for_even_counts() {
    let r = Rollup::from_values(&[0.1, 0.2, 0.3, 0.4]).unwrap();
    assert!((r.p50 - 0.25).abs() < 1e-12);
  }

  #[test]
  fn p90_interpolates() {
    // rank = 0.9 * 9 = 8.1 → between index 8 (0.9) and 9 (1.0).
    let values: Vec<f64> = (0..=9).map(|i| i as f64 / 10.0 + 0.1).collect();
    let r = Rollup::from_values(&values).unwrap();
    assert!((r.p90 - 0.91).abs() < 1e-12);
  }

  #[test]
  fn unsorted_input_handled() {
    let r = Rollup::from_values(&[0.6, 0.2, 0.4]).unwrap();
    assert_eq!(r.min, 0.2);
    assert_eq!(r.max, 0.6);
    assert!((r.p50 - 0.4).abs() < 1e-12);
  }
}
