//! Runs every insight rule for one subject and collects what fired.
//!
//! Rules are independent: one rule failing never prevents the others from
//! running, and re-running a cycle over unchanged data converges on the same
//! stored state because each rule replaces its own record.

use chrono::{DateTime, Utc};
use pawsight_core::{insight::InsightCategory, store::EventStore};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  Error, Result, RuleConfig,
  rules::{self, AnalysisScope, RuleOutcome, SkipReason},
};

// ─── Reports ─────────────────────────────────────────────────────────────────

/// The result of one rule within a cycle.
#[derive(Debug)]
pub struct RuleReport {
  pub category: InsightCategory,
  pub result:   Result<RuleOutcome>,
}

/// Flat view of a [`RuleReport`] for display collaborators.
#[derive(Debug, Clone, Serialize)]
pub struct RuleSummary {
  pub category: InsightCategory,
  pub created:  bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub summary:  Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub score:    Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reason:   Option<String>,
}

impl RuleReport {
  pub fn is_created(&self) -> bool {
    self.result.as_ref().is_ok_and(RuleOutcome::is_created)
  }

  pub fn to_summary(&self) -> RuleSummary {
    match &self.result {
      Ok(outcome) => RuleSummary {
        category: self.category,
        created:  outcome.is_created(),
        summary:  outcome.summary().map(str::to_owned),
        score:    outcome.score(),
        reason:   outcome.reason().map(|r| r.to_string()),
      },
      Err(e) => RuleSummary {
        category: self.category,
        created:  false,
        summary:  None,
        score:    None,
        reason:   Some(e.to_string()),
      },
    }
  }
}

/// Aggregate state of a cycle, for choosing what to tell the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
  /// At least one rule created an insight.
  NewInsights(usize),
  /// Every rule ran; none found a significant pattern.
  NothingNew,
  /// The store could not be reached.
  StoreUnavailable,
  /// The store answered but every rule failed.
  AllFailed,
}

impl CycleStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::NewInsights(_) => "new_insights",
      Self::NothingNew => "nothing_new",
      Self::StoreUnavailable => "store_unavailable",
      Self::AllFailed => "all_failed",
    }
  }
}

/// Everything one cycle produced, in category order.
#[derive(Debug)]
pub struct CycleReport {
  pub subject_id: Uuid,
  pub ran_at:     DateTime<Utc>,
  pub rules:      Vec<RuleReport>,
}

impl CycleReport {
  /// `(category, summary, score)` for each rule that fired.
  pub fn created(&self) -> Vec<(InsightCategory, &str, f64)> {
    self
      .rules
      .iter()
      .filter_map(|r| match &r.result {
        Ok(RuleOutcome::Created { summary, score, .. }) => Some((r.category, summary.as_str(), *score)),
        _ => None,
      })
      .collect()
  }

  pub fn failures(&self) -> Vec<(InsightCategory, &Error)> {
    self
      .rules
      .iter()
      .filter_map(|r| r.result.as_ref().err().map(|e| (r.category, e)))
      .collect()
  }

  pub fn status(&self) -> CycleStatus {
    let created = self.rules.iter().filter(|r| r.is_created()).count();
    if created > 0 {
      return CycleStatus::NewInsights(created);
    }
    let no_source = self.rules.iter().all(|r| {
      matches!(
        r.result,
        Ok(RuleOutcome::NotCreated { reason: SkipReason::NoDataSource })
          | Err(Error::StoreUnavailable(_))
      )
    });
    if no_source {
      CycleStatus::StoreUnavailable
    } else if self.rules.iter().all(|r| r.result.is_err()) {
      CycleStatus::AllFailed
    } else {
      CycleStatus::NothingNew
    }
  }

  /// The message to surface to the owner after this cycle.
  pub fn message(&self) -> String {
    match self.status() {
      CycleStatus::NewInsights(_) => self
        .created()
        .into_iter()
        .map(|(_, summary, _)| summary)
        .collect::<Vec<_>>()
        .join("\n\n"),
      CycleStatus::NothingNew => "No new insights".to_owned(),
      CycleStatus::StoreUnavailable => {
        "Insight data source is unreachable; insights were not updated".to_owned()
      }
      CycleStatus::AllFailed => "Insights could not be computed this time".to_owned(),
    }
  }

  pub fn summaries(&self) -> Vec<RuleSummary> {
    self.rules.iter().map(RuleReport::to_summary).collect()
  }
}

// ─── Cycles ──────────────────────────────────────────────────────────────────

/// Check reachability first so an offline store is reported once, without
/// issuing seven doomed queries.
async fn preflight<S: EventStore>(store: &S, scope: &AnalysisScope) -> Option<CycleReport> {
  let Err(e) = store.ping().await else { return None };
  if !pawsight_core::store::StoreError::is_unavailable(&e) {
    tracing::warn!(subject_id = %scope.subject_id, error = %e, "store ping failed; running rules anyway");
    return None;
  }
  tracing::warn!(subject_id = %scope.subject_id, error = %e, "store unreachable; skipping cycle");
  Some(CycleReport {
    subject_id: scope.subject_id,
    ran_at:     scope.now,
    rules:      InsightCategory::ALL
      .into_iter()
      .map(|category| RuleReport {
        category,
        result: Ok(RuleOutcome::NotCreated { reason: SkipReason::NoDataSource }),
      })
      .collect(),
  })
}

fn finish(scope: &AnalysisScope, rules: Vec<RuleReport>) -> CycleReport {
  let report = CycleReport { subject_id: scope.subject_id, ran_at: scope.now, rules };
  tracing::info!(
    subject_id = %scope.subject_id,
    status = ?report.status(),
    failures = report.failures().len(),
    "insight cycle finished"
  );
  report
}

/// Run all seven rules one after another.
pub async fn run_cycle<S: EventStore>(
  store: &S,
  config: &RuleConfig,
  scope: AnalysisScope,
) -> CycleReport {
  if let Some(report) = preflight(store, &scope).await {
    return report;
  }

  let mut reports = Vec::with_capacity(InsightCategory::ALL.len());
  for category in InsightCategory::ALL {
    let result = rules::evaluate(category, store, config, &scope).await;
    reports.push(RuleReport { category, result });
  }
  finish(&scope, reports)
}

/// Run all seven rules as concurrent tasks against a shared store handle.
///
/// Same contract as [`run_cycle`]; reports come back in category order.
pub async fn run_cycle_concurrent<S>(
  store: &S,
  config: &RuleConfig,
  scope: AnalysisScope,
) -> CycleReport
where
  S: EventStore + Clone + 'static,
{
  if let Some(report) = preflight(store, &scope).await {
    return report;
  }

  let handles: Vec<_> = InsightCategory::ALL
    .into_iter()
    .map(|category| {
      let store = store.clone();
      let config = config.clone();
      let handle =
        tokio::spawn(async move { rules::evaluate(category, &store, &config, &scope).await });
      (category, handle)
    })
    .collect();

  let mut reports = Vec::with_capacity(handles.len());
  for (category, handle) in handles {
    let result = handle.await.map_err(Error::from).and_then(|r| r);
    reports.push(RuleReport { category, result });
  }
  finish(&scope, reports)
}
