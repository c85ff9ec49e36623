//! `dogseen_hr`: heart-rate change in the minutes after seeing another dog.

use pawsight_core::{
  insight::{InsightCategory, NewInsight},
  signal::ContextLabel,
  store::EventStore,
};
use serde_json::json;

use super::{AnalysisScope, RuleOutcome, SkipReason, context_series, guard, heart_rate_series, publish};
use crate::{
  Result,
  config::DogSeenHrConfig,
  window::{Window, bpm_stats, mean},
};

const CATEGORY: InsightCategory = InsightCategory::DogseenHr;

pub async fn evaluate<S: EventStore>(
  store: &S,
  cfg: &DogSeenHrConfig,
  scope: &AnalysisScope,
) -> Result<RuleOutcome> {
  guard(CATEGORY, scope, async {
    let range = scope.range(cfg.lookback());
    let sightings = context_series(store, range, &[ContextLabel::DogSeen]).await?;
    let hr = heart_rate_series(store, range).await?;

    let window = Window::symmetric(cfg.window());
    let deltas: Vec<f64> = sightings
      .iter()
      .filter_map(|e| {
        let split = hr.around(e.timestamp, window);
        Some(bpm_stats(split.post)?.mean - bpm_stats(split.pre)?.mean)
      })
      .collect();

    let avg_delta = mean(&deltas).ok_or(SkipReason::NoQualifyingWindows)?;
    if avg_delta <= cfg.min_mean_delta_bpm {
      return Err(SkipReason::BelowThreshold.into());
    }

    let summary = format!(
      "Heart rate increases by ~{avg_delta:.1} bpm for {} min after seeing another dog.",
      cfg.window_minutes
    );
    let score = (avg_delta / cfg.score_scale_bpm).min(1.0);
    let details = json!({ "avg_delta": avg_delta, "events": deltas.len() });

    publish(store, CATEGORY, scope, NewInsight::new(scope.now, summary, score, details)).await
  })
  .await
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{MemoryStore, at, scope};

  #[tokio::test]
  async fn fires_on_a_fifteen_bpm_rise() {
    let store = MemoryStore::default();
    store.context(ContextLabel::DogSeen, at(0));
    for (m, bpm) in [(-10, 78.0), (-5, 82.0), (2, 94.0), (8, 96.0)] {
      store.hr(at(m), bpm);
    }

    let outcome = evaluate(&store, &DogSeenHrConfig::default(), &scope(&store)).await.unwrap();

    assert!(outcome.is_created());
    assert!((outcome.score().unwrap() - 0.5).abs() < 1e-9);
  }

  #[tokio::test]
  async fn events_missing_a_window_are_disqualified() {
    let store = MemoryStore::default();
    // Only post samples: the pre window is empty, so the event is skipped
    // rather than compared against a zero baseline.
    store.context(ContextLabel::DogSeen, at(0));
    store.hr(at(3), 120.0);

    let outcome = evaluate(&store, &DogSeenHrConfig::default(), &scope(&store)).await.unwrap();
    assert_eq!(outcome.reason(), Some(SkipReason::NoQualifyingWindows));
  }

  #[tokio::test]
  async fn delta_must_exceed_ten() {
    let store = MemoryStore::default();
    store.context(ContextLabel::DogSeen, at(0));
    store.hr(at(-5), 80.0);
    store.hr(at(5), 90.0);

    let outcome = evaluate(&store, &DogSeenHrConfig::default(), &scope(&store)).await.unwrap();
    assert_eq!(outcome.reason(), Some(SkipReason::BelowThreshold));
  }

  #[tokio::test]
  async fn no_heart_rate_data() {
    let store = MemoryStore::default();
    store.context(ContextLabel::DogSeen, at(0));

    let outcome = evaluate(&store, &DogSeenHrConfig::default(), &scope(&store)).await.unwrap();
    assert_eq!(outcome.reason(), Some(SkipReason::NoSignalData));
  }
}
