//! `night_whine`: whining concentrated in the night hours.
//!
//! No context events are involved: each whine in the lookback is classified
//! by its local hour of day.

use chrono::{FixedOffset, Timelike as _};
use pawsight_core::{
  insight::{InsightCategory, NewInsight},
  signal::Vocalization,
  store::{AudioQuery, EventStore},
};
use serde_json::json;

use super::{AnalysisScope, RuleOutcome, SkipReason, audio_series, guard, publish};
use crate::{Result, config::NightWhineConfig};

const CATEGORY: InsightCategory = InsightCategory::NightWhine;

pub async fn evaluate<S: EventStore>(
  store: &S,
  cfg: &NightWhineConfig,
  offset: FixedOffset,
  scope: &AnalysisScope,
) -> Result<RuleOutcome> {
  guard(CATEGORY, scope, async {
    let query = AudioQuery { range: scope.range(cfg.lookback()), kind: Some(Vocalization::Whine) };
    let whines = audio_series(store, query).await?;

    let night = whines
      .iter()
      .filter(|e| cfg.is_night(e.timestamp.with_timezone(&offset).hour()))
      .count();
    let day = whines.len() - night;

    if !(night >= day && night >= cfg.min_night_count) {
      return Err(SkipReason::BelowThreshold.into());
    }

    let summary = format!(
      "Whining occurs more often at night ({:02}:00–{:02}:00), suggesting sleep or comfort issues.",
      cfg.night_start_hour, cfg.night_end_hour
    );
    let details = json!({ "night": night, "day": day });

    publish(store, CATEGORY, scope, NewInsight::new(scope.now, summary, cfg.score, details)).await
  })
  .await
}
