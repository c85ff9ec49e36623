//! Aggregates over raw telemetry for display.

use chrono::{FixedOffset, Timelike as _};
use pawsight_core::signal::{AudioEvent, HeartRateSample};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeartRateSummary {
  pub count: usize,
  pub min:   f64,
  pub max:   f64,
  pub mean:  f64,
}

/// `None` when there are no samples.
pub fn heart_rate_summary(samples: &[HeartRateSample]) -> Option<HeartRateSummary> {
  let first = samples.first()?.bpm;
  let (min, max, sum) = samples.iter().fold((first, first, 0.0), |(lo, hi, sum), s| {
    (lo.min(s.bpm), hi.max(s.bpm), sum + s.bpm)
  });
  Some(HeartRateSummary { count: samples.len(), min, max, mean: sum / samples.len() as f64 })
}

/// Vocalization counts by local hour of day.
pub fn hourly_vocalizations(events: &[AudioEvent], offset: FixedOffset) -> [u32; 24] {
  let mut hours = [0u32; 24];
  for event in events {
    let hour = event.timestamp.with_timezone(&offset).hour() as usize;
    hours[hour] += 1;
  }
  hours
}

#[cfg(test)]
mod tests {
  use chrono::{TimeDelta, TimeZone as _, Utc};
  use pawsight_core::signal::Vocalization;
  use uuid::Uuid;

  use super::*;

  fn hr(bpm: f64) -> HeartRateSample {
    HeartRateSample { subject_id: Uuid::nil(), timestamp: Utc::now(), bpm }
  }

  #[test]
  fn summarises_heart_rate() {
    let summary = heart_rate_summary(&[hr(80.0), hr(60.0), hr(100.0)]).unwrap();
    assert_eq!(summary.count, 3);
    assert_eq!(summary.min, 60.0);
    assert_eq!(summary.max, 100.0);
    assert_eq!(summary.mean, 80.0);
    assert!(heart_rate_summary(&[]).is_none());
  }

  #[test]
  fn buckets_by_local_hour() {
    let base = Utc.with_ymd_and_hms(2025, 3, 1, 23, 30, 0).unwrap();
    let events: Vec<AudioEvent> = [0, 10, 40]
      .into_iter()
      .map(|m| AudioEvent {
        subject_id: Uuid::nil(),
        timestamp:  base + TimeDelta::minutes(m),
        kind:       Vocalization::Bark,
        confidence: 0.8,
      })
      .collect();

    let utc = hourly_vocalizations(&events, FixedOffset::east_opt(0).unwrap());
    assert_eq!(utc[23], 2);
    assert_eq!(utc[0], 1);

    let plus_one = hourly_vocalizations(&events, FixedOffset::east_opt(3600).unwrap());
    assert_eq!(plus_one[0], 2);
    assert_eq!(plus_one[1], 1);
    assert_eq!(plus_one.iter().sum::<u32>(), 3);
  }
}
