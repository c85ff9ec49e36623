//! `play_calm`: heart rate settling after play.

use pawsight_core::{
  insight::{InsightCategory, NewInsight},
  signal::ContextLabel,
  store::EventStore,
};
use serde_json::json;

use super::{AnalysisScope, RuleOutcome, SkipReason, context_series, guard, heart_rate_series, publish};
use crate::{
  Result,
  config::PlayCalmConfig,
  window::{Window, bpm_stats, mean},
};

const CATEGORY: InsightCategory = InsightCategory::PlayCalm;

pub async fn evaluate<S: EventStore>(
  store: &S,
  cfg: &PlayCalmConfig,
  scope: &AnalysisScope,
) -> Result<RuleOutcome> {
  guard(CATEGORY, scope, async {
    let range = scope.range(cfg.lookback());
    let sessions = context_series(store, range, &[ContextLabel::Play, ContextLabel::Toy]).await?;
    let hr = heart_rate_series(store, range).await?;

    let window = Window::symmetric(cfg.window());
    let drops: Vec<f64> = sessions
      .iter()
      .filter_map(|e| {
        let split = hr.around(e.timestamp, window);
        Some(bpm_stats(split.pre)?.mean - bpm_stats(split.post)?.mean)
      })
      .collect();

    let avg_drop = mean(&drops).ok_or(SkipReason::NoQualifyingWindows)?;
    if avg_drop <= cfg.min_mean_drop_bpm {
      return Err(SkipReason::BelowThreshold.into());
    }

    let summary = format!(
      "Play sessions reduce heart rate by ~{avg_drop:.1} bpm afterward, suggesting relaxation."
    );
    let details = json!({ "avg": avg_drop, "sessions": drops.len() });

    publish(store, CATEGORY, scope, NewInsight::new(scope.now, summary, cfg.score, details)).await
  })
  .await
}
