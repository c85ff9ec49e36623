//! `car_hr`: heart-rate elevation during car rides.
//!
//! The lift of one ride is the mean bpm in the first minutes of the ride
//! minus the mean bpm just before it. The rule fires on the largest lift but
//! scores on the mean of all lifts.

use pawsight_core::{
  insight::{InsightCategory, NewInsight},
  signal::ContextLabel,
  store::EventStore,
};
use serde_json::json;

use super::{AnalysisScope, RuleOutcome, SkipReason, context_series, guard, heart_rate_series, publish};
use crate::{
  Result,
  config::CarHrConfig,
  window::{Window, bpm_stats, mean},
};

const CATEGORY: InsightCategory = InsightCategory::CarHr;

pub async fn evaluate<S: EventStore>(
  store: &S,
  cfg: &CarHrConfig,
  scope: &AnalysisScope,
) -> Result<RuleOutcome> {
  guard(CATEGORY, scope, async {
    let range = scope.range(cfg.lookback());
    let rides = context_series(store, range, &[ContextLabel::Car]).await?;
    let hr = heart_rate_series(store, range).await?;

    let window = Window::symmetric(cfg.window());
    let lifts: Vec<f64> = rides
      .iter()
      .filter_map(|ride| {
        let split = hr.around(ride.timestamp, window);
        Some(bpm_stats(split.post)?.mean - bpm_stats(split.pre)?.mean)
      })
      .collect();

    let avg_lift = mean(&lifts).ok_or(SkipReason::NoQualifyingWindows)?;
    let peak_lift = lifts.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if peak_lift <= cfg.min_peak_lift_bpm {
      return Err(SkipReason::BelowThreshold.into());
    }

    let summary = format!("Heart rate is elevated by ~{avg_lift:.1} bpm during car rides.");
    let score = (avg_lift / cfg.score_scale_bpm).min(1.0);
    let details = json!({ "avg": avg_lift, "peak": peak_lift, "rides": lifts.len() });

    publish(store, CATEGORY, scope, NewInsight::new(scope.now, summary, score, details)).await
  })
  .await
}
