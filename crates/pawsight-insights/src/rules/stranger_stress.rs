//! `stranger_stress`: barking or a heart-rate spike after meeting people.
//!
//! An encounter is flagged when enough vocalizations follow it, or when the
//! heart rate after it exceeds the heart rate before it by a margin. The
//! heart-rate test is only applied when both windows hold samples.

use pawsight_core::{
  insight::{InsightCategory, NewInsight},
  signal::ContextLabel,
  store::{AudioQuery, EventStore},
};
use serde_json::json;

use super::{
  AnalysisScope, RuleOutcome, SkipReason, audio_series, context_series, guard, heart_rate_series,
  publish,
};
use crate::{
  Result,
  config::StrangerStressConfig,
  window::{Window, bpm_stats},
};

const CATEGORY: InsightCategory = InsightCategory::StrangerStress;

pub async fn evaluate<S: EventStore>(
  store: &S,
  cfg: &StrangerStressConfig,
  scope: &AnalysisScope,
) -> Result<RuleOutcome> {
  guard(CATEGORY, scope, async {
    let range = scope.range(cfg.lookback());
    let meetings = context_series(store, range, &[ContextLabel::NewPerson]).await?;
    let audio = audio_series(store, AudioQuery { range, kind: None }).await?;
    let hr = heart_rate_series(store, range).await?;

    let audio_window = Window::post_only(cfg.window());
    let hr_window = Window::symmetric(cfg.window());
    let flagged = meetings
      .iter()
      .filter(|m| {
        let vocal = audio.around(m.timestamp, audio_window).post.len();
        let split = hr.around(m.timestamp, hr_window);
        let spiked = match (bpm_stats(split.pre), bpm_stats(split.post)) {
          (Some(pre), Some(post)) => post.mean - pre.mean > cfg.min_hr_delta_bpm,
          _ => false,
        };
        vocal >= cfg.min_vocalizations || spiked
      })
      .count();

    if flagged == 0 {
      return Err(SkipReason::BelowThreshold.into());
    }

    let summary = format!(
      "Dog shows stress (barks or HR spike) within {} min of meeting new people.",
      cfg.window_minutes
    );
    let details = json!({ "flagged": flagged, "meetings": meetings.len() });

    publish(store, CATEGORY, scope, NewInsight::new(scope.now, summary, cfg.score, details)).await
  })
  .await
}

#[cfg(test)]
mod tests {
  use chrono::TimeDelta;
  use pawsight_core::signal::Vocalization;

  use super::*;
  use crate::testing::{MemoryStore, at, scope};

  fn meeting(store: &MemoryStore) {
    store.context(ContextLabel::NewPerson, at(0));
    // Unrelated readings keep both streams non-empty.
    store.hr(at(-90), 70.0);
    store.audio(Vocalization::Bark, at(-90));
  }

  #[tokio::test]
  async fn three_barks_flag_a_meeting() {
    let store = MemoryStore::default();
    meeting(&store);
    for i in 0..3 {
      store.audio(Vocalization::Bark, at(0) + TimeDelta::minutes(i * 5));
    }

    let outcome =
      evaluate(&store, &StrangerStressConfig::default(), &scope(&store)).await.unwrap();
    assert!(outcome.is_created());
    assert_eq!(outcome.score(), Some(0.8));
  }

  #[tokio::test]
  async fn heart_rate_spike_flags_a_meeting() {
    let store = MemoryStore::default();
    meeting(&store);
    store.hr(at(-5), 80.0);
    store.hr(at(5), 93.0);

    let outcome =
      evaluate(&store, &StrangerStressConfig::default(), &scope(&store)).await.unwrap();
    assert!(outcome.is_created());
  }

  #[tokio::test]
  async fn missing_baseline_is_not_a_spike() {
    let store = MemoryStore::default();
    meeting(&store);
    // No pre-window samples: a zero baseline would wrongly read as +120.
    store.hr(at(5), 120.0);

    let outcome =
      evaluate(&store, &StrangerStressConfig::default(), &scope(&store)).await.unwrap();
    assert_eq!(outcome.reason(), Some(SkipReason::BelowThreshold));
  }

  #[tokio::test]
  async fn requires_audio_stream() {
    let store = MemoryStore::default();
    store.context(ContextLabel::NewPerson, at(0));
    store.hr(at(-5), 80.0);
    store.hr(at(5), 120.0);

    let outcome =
      evaluate(&store, &StrangerStressConfig::default(), &scope(&store)).await.unwrap();
    assert_eq!(outcome.reason(), Some(SkipReason::NoSignalData));
  }
}
