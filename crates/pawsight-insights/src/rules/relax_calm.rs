//! `relax_calm`: stable heart rate while the dog is relaxing.

use pawsight_core::{
  insight::{InsightCategory, NewInsight},
  signal::ContextLabel,
  store::EventStore,
};
use serde_json::json;

use super::{AnalysisScope, RuleOutcome, SkipReason, context_series, guard, heart_rate_series, publish};
use crate::{
  Result,
  config::RelaxCalmConfig,
  window::{Window, bpm_stats},
};

const CATEGORY: InsightCategory = InsightCategory::RelaxCalm;

pub async fn evaluate<S: EventStore>(
  store: &S,
  cfg: &RelaxCalmConfig,
  scope: &AnalysisScope,
) -> Result<RuleOutcome> {
  guard(CATEGORY, scope, async {
    let range = scope.range(cfg.lookback());
    let sessions = context_series(store, range, &[ContextLabel::Relaxing]).await?;
    let hr = heart_rate_series(store, range).await?;

    let window = Window::post_only(cfg.window());
    let variances: Vec<f64> = sessions
      .iter()
      .filter_map(|e| bpm_stats(hr.around(e.timestamp, window).post))
      .map(|stats| stats.variance)
      .collect();

    if variances.is_empty() {
      return Err(SkipReason::NoQualifyingWindows.into());
    }
    let calm = variances.iter().filter(|v| **v < cfg.max_variance).count();
    if calm == 0 {
      return Err(SkipReason::BelowThreshold.into());
    }

    let summary = "Relaxation periods show stable heart rate (low variance), indicating calm state.";
    let details = json!({ "samples": calm, "sessions": variances.len() });

    publish(store, CATEGORY, scope, NewInsight::new(scope.now, summary, cfg.score, details)).await
  })
  .await
}
