//! `car_bark_risk`: vocalization rate in the hour before vs after car rides.
//!
//! Rates are per event and per hour of window, so the pre and post rates
//! are directly comparable. A zero pre rate makes the ratio infinite when
//! anything was heard afterwards, and 1 when nothing was.

use pawsight_core::{
  insight::{InsightCategory, NewInsight},
  signal::ContextLabel,
  store::{AudioQuery, EventStore},
};
use serde_json::json;

use super::{AnalysisScope, RuleOutcome, SkipReason, audio_series, context_series, finite, guard, publish};
use crate::{Result, config::CarBarkConfig, window::Window};

const CATEGORY: InsightCategory = InsightCategory::CarBarkRisk;

pub async fn evaluate<S: EventStore>(
  store: &S,
  cfg: &CarBarkConfig,
  scope: &AnalysisScope,
) -> Result<RuleOutcome> {
  guard(CATEGORY, scope, async {
    let range = scope.range(cfg.lookback());
    let rides = context_series(store, range, &[ContextLabel::Car]).await?;
    let audio = audio_series(store, AudioQuery { range, kind: None }).await?;

    let window = Window::symmetric(cfg.window());
    let (mut pre_total, mut post_total) = (0usize, 0usize);
    for ride in rides.iter() {
      let split = audio.around(ride.timestamp, window);
      pre_total += split.pre.len();
      post_total += split.post.len();
    }

    let per_event_hours = rides.len() as f64 * cfg.window_hours();
    let pre_rate = pre_total as f64 / per_event_hours;
    let post_rate = post_total as f64 / per_event_hours;
    let ratio = rate_ratio(pre_rate, post_rate);

    if !(post_rate >= pre_rate + cfg.min_rate_lift_per_hour && ratio >= cfg.min_ratio) {
      tracing::debug!(
        subject_id = %scope.subject_id,
        pre_rate,
        post_rate,
        ratio,
        "car bark lift below threshold"
      );
      return Err(SkipReason::BelowThreshold.into());
    }

    let score = (ratio - 1.0).tanh().max(cfg.min_score).min(1.0);
    let summary = format!(
      "Barking increases for ~{} min after car rides ({post_rate:.1}/h vs {pre_rate:.1}/h baseline).",
      cfg.window_minutes
    );
    let details = json!({
      "windows":   rides.len(),
      "pre_rate":  pre_rate,
      "post_rate": post_rate,
      "ratio":     finite(ratio),
    });

    publish(store, CATEGORY, scope, NewInsight::new(scope.now, summary, score, details)).await
  })
  .await
}

fn rate_ratio(pre: f64, post: f64) -> f64 {
  if pre == 0.0 {
    if post > 0.0 { f64::INFINITY } else { 1.0 }
  } else {
    post / pre
  }
}
