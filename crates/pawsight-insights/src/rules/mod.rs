//! The seven insight rules.
//!
//! Each rule fetches the context events it anchors on, fetches the signal
//! streams it correlates, applies a fixed significance test over the
//! windows around every matched event, and on success upserts one record
//! for its category. Rules share no state and can run in any order.
//!
//! Outcomes:
//! - a required stream is empty → [`RuleOutcome::NotCreated`], nothing written;
//! - the store is unreachable → not created with [`SkipReason::NoDataSource`];
//! - any other store failure → `Err`, isolated to that rule.

pub mod car_bark;
pub mod car_hr;
pub mod dogseen_hr;
pub mod night_whine;
pub mod play_calm;
pub mod relax_calm;
pub mod stranger_stress;

use std::{fmt, future::Future};

use chrono::{DateTime, TimeDelta, Utc};
use pawsight_core::{
  insight::{InsightCategory, InsightKey, NewInsight, OnConflict},
  signal::{AudioEvent, ContextEvent, ContextLabel, HeartRateSample},
  store::{AudioQuery, ContextQuery, EventStore, RangeQuery, StoreError},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{Error, Result, RuleConfig, window::Series};

// ─── Scope ───────────────────────────────────────────────────────────────────

/// Who is analysed and the instant lookbacks are measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisScope {
  pub subject_id: Uuid,
  pub now:        DateTime<Utc>,
}

impl AnalysisScope {
  pub fn new(subject_id: Uuid, now: DateTime<Utc>) -> Self { Self { subject_id, now } }

  /// Everything recorded for the subject since `now - lookback`.
  pub fn range(&self, lookback: TimeDelta) -> RangeQuery {
    let since = self
      .now
      .checked_sub_signed(lookback)
      .unwrap_or(DateTime::<Utc>::MIN_UTC);
    RangeQuery::since(self.subject_id, since)
  }
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// Why a rule did not create an insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
  /// The store could not be reached.
  NoDataSource,
  /// No context events with the rule's labels in range.
  NoContextEvents,
  /// A signal stream the rule needs has no data in range.
  NoSignalData,
  /// Every context event had an empty window where a mean was needed.
  NoQualifyingWindows,
  /// The significance test did not hold.
  BelowThreshold,
}

impl fmt::Display for SkipReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::NoDataSource => "no data source",
      Self::NoContextEvents => "no matching context events",
      Self::NoSignalData => "no signal data in range",
      Self::NoQualifyingWindows => "no event had usable windows",
      Self::BelowThreshold => "no significant pattern",
    })
  }
}

/// The externally observable result of one rule run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RuleOutcome {
  Created {
    summary: String,
    score:   f64,
    details: serde_json::Value,
  },
  NotCreated {
    reason: SkipReason,
  },
}

impl RuleOutcome {
  pub fn is_created(&self) -> bool { matches!(self, Self::Created { .. }) }

  pub fn summary(&self) -> Option<&str> {
    match self {
      Self::Created { summary, .. } => Some(summary),
      Self::NotCreated { .. } => None,
    }
  }

  pub fn score(&self) -> Option<f64> {
    match self {
      Self::Created { score, .. } => Some(*score),
      Self::NotCreated { .. } => None,
    }
  }

  pub fn reason(&self) -> Option<SkipReason> {
    match self {
      Self::Created { .. } => None,
      Self::NotCreated { reason } => Some(*reason),
    }
  }
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

/// Run the rule for `category`.
pub async fn evaluate<S: EventStore>(
  category: InsightCategory,
  store: &S,
  config: &RuleConfig,
  scope: &AnalysisScope,
) -> Result<RuleOutcome> {
  match category {
    InsightCategory::CarBarkRisk => car_bark::evaluate(store, &config.car_bark, scope).await,
    InsightCategory::DogseenHr => dogseen_hr::evaluate(store, &config.dogseen_hr, scope).await,
    InsightCategory::NightWhine => {
      night_whine::evaluate(store, &config.night_whine, config.utc_offset(), scope).await
    }
    InsightCategory::CarHr => car_hr::evaluate(store, &config.car_hr, scope).await,
    InsightCategory::PlayCalm => play_calm::evaluate(store, &config.play_calm, scope).await,
    InsightCategory::StrangerStress => {
      stranger_stress::evaluate(store, &config.stranger_stress, scope).await
    }
    InsightCategory::RelaxCalm => relax_calm::evaluate(store, &config.relax_calm, scope).await,
  }
}

// ─── Shared plumbing ─────────────────────────────────────────────────────────

/// Early exit from a rule body: either a normal skip or a store failure.
pub(crate) enum Stop {
  Skip(SkipReason),
  Store {
    unavailable: bool,
    source:      Box<dyn std::error::Error + Send + Sync>,
  },
}

impl Stop {
  pub(crate) fn store<E: StoreError>(e: E) -> Self {
    Self::Store { unavailable: e.is_unavailable(), source: Box::new(e) }
  }
}

impl From<SkipReason> for Stop {
  fn from(reason: SkipReason) -> Self { Self::Skip(reason) }
}

/// Turn a rule body's early exits into the public outcome, logging each.
pub(crate) async fn guard<F>(
  category: InsightCategory,
  scope: &AnalysisScope,
  body: F,
) -> Result<RuleOutcome>
where
  F: Future<Output = Result<RuleOutcome, Stop>>,
{
  match body.await {
    Ok(outcome) => Ok(outcome),
    Err(Stop::Skip(reason)) => {
      tracing::debug!(
        subject_id = %scope.subject_id,
        %category,
        %reason,
        "insight not created"
      );
      Ok(RuleOutcome::NotCreated { reason })
    }
    Err(Stop::Store { unavailable: true, source }) => {
      tracing::warn!(
        subject_id = %scope.subject_id,
        %category,
        error = %source,
        "store unreachable; skipping rule"
      );
      Ok(RuleOutcome::NotCreated { reason: SkipReason::NoDataSource })
    }
    Err(Stop::Store { unavailable: false, source }) => {
      tracing::warn!(
        subject_id = %scope.subject_id,
        %category,
        error = %source,
        "rule query failed"
      );
      Err(Error::QueryFailure(source))
    }
  }
}

/// Context events with any of `labels`; skips the rule when there are none.
pub(crate) async fn context_series<S: EventStore>(
  store: &S,
  range: RangeQuery,
  labels: &[ContextLabel],
) -> Result<Series<ContextEvent>, Stop> {
  let query = ContextQuery { range, labels: labels.to_vec() };
  let events = store.context_events(&query).await.map_err(Stop::store)?;
  if events.is_empty() {
    return Err(SkipReason::NoContextEvents.into());
  }
  Ok(Series::new(events))
}

/// Heart-rate samples in range; skips the rule when there are none.
pub(crate) async fn heart_rate_series<S: EventStore>(
  store: &S,
  range: RangeQuery,
) -> Result<Series<HeartRateSample>, Stop> {
  let samples = store.heart_rate(&range).await.map_err(Stop::store)?;
  if samples.is_empty() {
    return Err(SkipReason::NoSignalData.into());
  }
  Ok(Series::new(samples))
}

/// Audio events in range; skips the rule when there are none.
pub(crate) async fn audio_series<S: EventStore>(
  store: &S,
  query: AudioQuery,
) -> Result<Series<AudioEvent>, Stop> {
  let events = store.audio_events(&query).await.map_err(Stop::store)?;
  if events.is_empty() {
    return Err(SkipReason::NoSignalData.into());
  }
  Ok(Series::new(events))
}

/// Replace the record for `(scope.subject_id, category)` and report it.
pub(crate) async fn publish<S: EventStore>(
  store: &S,
  category: InsightCategory,
  scope: &AnalysisScope,
  insight: NewInsight,
) -> Result<RuleOutcome, Stop> {
  let key = InsightKey { subject_id: scope.subject_id, category };
  let record = store
    .upsert_insight(key, insight, OnConflict::Replace)
    .await
    .map_err(Stop::store)?;
  tracing::info!(
    subject_id = %scope.subject_id,
    %category,
    score = record.score,
    "insight created"
  );
  Ok(RuleOutcome::Created {
    summary: record.summary,
    score:   record.score,
    details: record.details,
  })
}

/// `value` if finite, otherwise JSON `null`.
pub(crate) fn finite(value: f64) -> Option<f64> { value.is_finite().then_some(value) }
