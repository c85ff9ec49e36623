//! Insight records: the scored conclusions derived by the rule engine.
//!
//! A subject has at most one live record per [`InsightCategory`]. A rule run
//! that fires replaces whatever record previously existed for that pair; no
//! history is kept.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Category ────────────────────────────────────────────────────────────────

/// The seven fixed insight categories, one per rule.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InsightCategory {
  CarBarkRisk,
  DogseenHr,
  NightWhine,
  CarHr,
  PlayCalm,
  StrangerStress,
  RelaxCalm,
}

impl InsightCategory {
  pub const ALL: [Self; 7] = [
    Self::CarBarkRisk,
    Self::DogseenHr,
    Self::NightWhine,
    Self::CarHr,
    Self::PlayCalm,
    Self::StrangerStress,
    Self::RelaxCalm,
  ];

  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownCategory(s.to_owned()))
  }
}

// ─── Severity ────────────────────────────────────────────────────────────────

/// Display band for an insight score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Low,
  Medium,
  High,
}

impl Severity {
  pub fn from_score(score: f64) -> Self {
    if score >= 0.75 {
      Self::High
    } else if score >= 0.5 {
      Self::Medium
    } else {
      Self::Low
    }
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// The conflict key of the insight table: one live record per pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InsightKey {
  pub subject_id: Uuid,
  pub category:   InsightCategory,
}

/// What an upsert does when a record for the key already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnConflict {
  /// Overwrite the existing record (the rule engine's only mode).
  #[default]
  Replace,
  /// Leave the existing record untouched and return it.
  Keep,
}

/// The payload of an insight, without its key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInsight {
  pub computed_at: DateTime<Utc>,
  /// Human-readable conclusion shown to the owner.
  pub summary:     String,
  /// Clamped into `[0, 1]` by [`NewInsight::new`].
  pub score:       f64,
  /// Opaque structured statistics backing the conclusion.
  pub details:     serde_json::Value,
}

impl NewInsight {
  pub fn new(
    computed_at: DateTime<Utc>,
    summary: impl Into<String>,
    score: f64,
    details: serde_json::Value,
  ) -> Self {
    let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
    Self { computed_at, summary: summary.into(), score, details }
  }
}

/// A stored insight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightRecord {
  pub subject_id:  Uuid,
  pub category:    InsightCategory,
  pub computed_at: DateTime<Utc>,
  pub summary:     String,
  pub score:       f64,
  pub details:     serde_json::Value,
}

impl InsightRecord {
  pub fn from_parts(key: InsightKey, insight: NewInsight) -> Self {
    Self {
      subject_id:  key.subject_id,
      category:    key.category,
      computed_at: insight.computed_at,
      summary:     insight.summary,
      score:       insight.score,
      details:     insight.details,
    }
  }

  pub fn key(&self) -> InsightKey {
    InsightKey { subject_id: self.subject_id, category: self.category }
  }

  pub fn severity(&self) -> Severity { Severity::from_score(self.score) }
}
