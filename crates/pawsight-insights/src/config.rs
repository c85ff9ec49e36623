//! Tunable thresholds for the insight rules.
//!
//! Every constant a rule compares against lives here so a deployment can
//! adjust it from `config.toml` without touching rule logic. Defaults are
//! the production values. Durations are expressed in whole minutes or hours
//! to keep the TOML readable.

use chrono::{FixedOffset, Offset as _, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Thresholds for all seven rules plus shared settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
  /// Offset applied before classifying timestamps by hour of day.
  pub utc_offset_minutes: i32,
  pub car_bark:           CarBarkConfig,
  pub dogseen_hr:         DogSeenHrConfig,
  pub night_whine:        NightWhineConfig,
  pub car_hr:             CarHrConfig,
  pub play_calm:          PlayCalmConfig,
  pub stranger_stress:    StrangerStressConfig,
  pub relax_calm:         RelaxCalmConfig,
}

impl RuleConfig {
  /// The local offset for hour-of-day classification. An out-of-range
  /// offset falls back to UTC.
  pub fn utc_offset(&self) -> FixedOffset {
    FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
      .unwrap_or_else(|| {
        tracing::warn!(
          minutes = self.utc_offset_minutes,
          "utc offset out of range; using UTC"
        );
        Utc.fix()
      })
  }

  /// Reject thresholds the rules cannot evaluate with: non-positive
  /// windows, negative lookbacks, scores outside `[0, 1]` and non-positive
  /// score scales.
  pub fn validate(&self) -> Result<()> {
    let lookbacks = [
      ("car_bark", self.car_bark.lookback_hours),
      ("dogseen_hr", self.dogseen_hr.lookback_hours),
      ("night_whine", self.night_whine.lookback_hours),
      ("car_hr", self.car_hr.lookback_hours),
      ("play_calm", self.play_calm.lookback_hours),
      ("stranger_stress", self.stranger_stress.lookback_hours),
      ("relax_calm", self.relax_calm.lookback_hours),
    ];
    for (rule, hours) in lookbacks {
      if hours < 0 {
        return Err(invalid(format!("{rule}.lookback_hours must not be negative")));
      }
    }

    let windows = [
      ("car_bark", self.car_bark.window_minutes),
      ("dogseen_hr", self.dogseen_hr.window_minutes),
      ("car_hr", self.car_hr.window_minutes),
      ("play_calm", self.play_calm.window_minutes),
      ("stranger_stress", self.stranger_stress.window_minutes),
      ("relax_calm", self.relax_calm.window_minutes),
    ];
    for (rule, minutes) in windows {
      if minutes <= 0 {
        return Err(invalid(format!("{rule}.window_minutes must be positive")));
      }
    }

    let scores = [
      ("car_bark.min_score", self.car_bark.min_score),
      ("night_whine.score", self.night_whine.score),
      ("play_calm.score", self.play_calm.score),
      ("stranger_stress.score", self.stranger_stress.score),
      ("relax_calm.score", self.relax_calm.score),
    ];
    for (field, score) in scores {
      if !(0.0..=1.0).contains(&score) {
        return Err(invalid(format!("{field} must be within [0, 1], got {score}")));
      }
    }

    let scales = [
      ("dogseen_hr.score_scale_bpm", self.dogseen_hr.score_scale_bpm),
      ("car_hr.score_scale_bpm", self.car_hr.score_scale_bpm),
    ];
    for (field, scale) in scales {
      if !(scale.is_finite() && scale > 0.0) {
        return Err(invalid(format!("{field} must be positive, got {scale}")));
      }
    }

    let night = &self.night_whine;
    if night.night_start_hour > 23 || night.night_end_hour > 23 {
      return Err(invalid("night_whine hours must be within 0..=23".to_owned()));
    }
    Ok(())
  }
}

fn invalid(message: String) -> Error { Error::InvalidConfig(message) }

fn hours(h: i64) -> TimeDelta { TimeDelta::try_hours(h).unwrap_or(TimeDelta::MAX) }

fn minutes(m: i64) -> TimeDelta { TimeDelta::try_minutes(m).unwrap_or(TimeDelta::MAX) }

// ─── Per-rule ────────────────────────────────────────────────────────────────

/// `car_bark_risk`: vocalization rate before vs after car rides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CarBarkConfig {
  pub lookback_hours:         i64,
  pub window_minutes:         i64,
  /// Post rate must exceed pre rate by at least this many events per hour.
  pub min_rate_lift_per_hour: f64,
  /// Post rate must be at least this multiple of the pre rate.
  pub min_ratio:              f64,
  /// Floor applied to the tanh score.
  pub min_score:              f64,
}

impl Default for CarBarkConfig {
  fn default() -> Self {
    Self {
      lookback_hours:         24,
      window_minutes:         60,
      min_rate_lift_per_hour: 3.0,
      min_ratio:              2.0,
      min_score:              0.5,
    }
  }
}

impl CarBarkConfig {
  pub fn lookback(&self) -> TimeDelta { hours(self.lookback_hours) }

  pub fn window(&self) -> TimeDelta { minutes(self.window_minutes) }

  pub fn window_hours(&self) -> f64 { self.window_minutes as f64 / 60.0 }
}

/// `dogseen_hr`: heart-rate change after seeing another dog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DogSeenHrConfig {
  pub lookback_hours:     i64,
  pub window_minutes:     i64,
  /// The mean post−pre delta must be strictly greater than this.
  pub min_mean_delta_bpm: f64,
  /// Delta at which the score saturates at 1.
  pub score_scale_bpm:    f64,
}

impl Default for DogSeenHrConfig {
  fn default() -> Self {
    Self {
      lookback_hours:     24,
      window_minutes:     15,
      min_mean_delta_bpm: 10.0,
      score_scale_bpm:    30.0,
    }
  }
}

impl DogSeenHrConfig {
  pub fn lookback(&self) -> TimeDelta { hours(self.lookback_hours) }

  pub fn window(&self) -> TimeDelta { minutes(self.window_minutes) }
}

/// `night_whine`: whining concentrated at night.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NightWhineConfig {
  pub lookback_hours:   i64,
  /// First local hour counted as night.
  pub night_start_hour: u32,
  /// First local hour counted as day again.
  pub night_end_hour:   u32,
  pub min_night_count:  usize,
  pub score:            f64,
}

impl Default for NightWhineConfig {
  fn default() -> Self {
    Self {
      lookback_hours:   7 * 24,
      night_start_hour: 22,
      night_end_hour:   6,
      min_night_count:  5,
      score:            0.7,
    }
  }
}

impl NightWhineConfig {
  pub fn lookback(&self) -> TimeDelta { hours(self.lookback_hours) }

  /// Whether a local hour of day falls in the night span. The span may wrap
  /// past midnight.
  pub fn is_night(&self, hour: u32) -> bool {
    let (start, end) = (self.night_start_hour, self.night_end_hour);
    if start <= end {
      (start..end).contains(&hour)
    } else {
      hour >= start || hour < end
    }
  }
}

/// `car_hr`: heart-rate elevation during car rides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CarHrConfig {
  pub lookback_hours:    i64,
  pub window_minutes:    i64,
  /// The largest per-ride lift must be strictly greater than this.
  pub min_peak_lift_bpm: f64,
  pub score_scale_bpm:   f64,
}

impl Default for CarHrConfig {
  fn default() -> Self {
    Self {
      lookback_hours:    24,
      window_minutes:    20,
      min_peak_lift_bpm: 15.0,
      score_scale_bpm:   40.0,
    }
  }
}

impl CarHrConfig {
  pub fn lookback(&self) -> TimeDelta { hours(self.lookback_hours) }

  pub fn window(&self) -> TimeDelta { minutes(self.window_minutes) }
}

/// `play_calm`: heart rate settling after play.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayCalmConfig {
  pub lookback_hours:    i64,
  pub window_minutes:    i64,
  /// The mean pre−post drop must be strictly greater than this.
  pub min_mean_drop_bpm: f64,
  pub score:             f64,
}

impl Default for PlayCalmConfig {
  fn default() -> Self {
    Self {
      lookback_hours:    24,
      window_minutes:    30,
      min_mean_drop_bpm: 5.0,
      score:             0.3,
    }
  }
}

impl PlayCalmConfig {
  pub fn lookback(&self) -> TimeDelta { hours(self.lookback_hours) }

  pub fn window(&self) -> TimeDelta { minutes(self.window_minutes) }
}

/// `stranger_stress`: barking or a heart-rate spike after meeting people.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrangerStressConfig {
  pub lookback_hours:    i64,
  pub window_minutes:    i64,
  /// Vocalizations in the post window that flag an event on their own.
  pub min_vocalizations: usize,
  /// A post−pre heart-rate delta strictly above this flags an event.
  pub min_hr_delta_bpm:  f64,
  pub score:             f64,
}

impl Default for StrangerStressConfig {
  fn default() -> Self {
    Self {
      lookback_hours:    24,
      window_minutes:    20,
      min_vocalizations: 3,
      min_hr_delta_bpm:  12.0,
      score:             0.8,
    }
  }
}

impl StrangerStressConfig {
  pub fn lookback(&self) -> TimeDelta { hours(self.lookback_hours) }

  pub fn window(&self) -> TimeDelta { minutes(self.window_minutes) }
}

/// `relax_calm`: stable heart rate while relaxing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaxCalmConfig {
  pub lookback_hours: i64,
  pub window_minutes: i64,
  /// Population variance (bpm²) strictly below this counts as calm.
  pub max_variance:   f64,
  pub score:          f64,
}

impl Default for RelaxCalmConfig {
  fn default() -> Self {
    Self {
      lookback_hours: 24,
      window_minutes: 20,
      max_variance:   25.0,
      score:          0.2,
    }
  }
}

impl RelaxCalmConfig {
  pub fn lookback(&self) -> TimeDelta { hours(self.lookback_hours) }

  pub fn window(&self) -> TimeDelta { minutes(self.window_minutes) }
}
