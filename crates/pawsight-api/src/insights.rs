//! Handlers for computed insights.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/subjects/:id/insights` | Newest first, with severity; `?limit` (default 20), `?min_score` |
//! | `POST` | `/subjects/:id/insights/recompute` | Runs every rule now and returns the cycle report |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use pawsight_core::{
  insight::{InsightRecord, Severity},
  store::{EventStore, InsightQuery},
};
use pawsight_insights::{AnalysisScope, orchestrator::RuleSummary, run_cycle};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

const DEFAULT_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub limit:     Option<usize>,
  pub min_score: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct InsightView {
  #[serde(flatten)]
  pub record:   InsightRecord,
  pub severity: Severity,
}

impl From<InsightRecord> for InsightView {
  fn from(record: InsightRecord) -> Self {
    let severity = record.severity();
    Self { record, severity }
  }
}

/// `GET /subjects/:id/insights[?limit=..][&min_score=..]`
pub async fn list<S: EventStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<InsightView>>, ApiError> {
  state.require_subject(id).await?;

  let query = InsightQuery {
    subject_id: Some(id),
    since:      None,
    min_score:  params.min_score,
    limit:      Some(params.limit.unwrap_or(DEFAULT_LIMIT)),
  };
  let records = state.store.list_insights(&query).await.map_err(ApiError::store)?;
  Ok(Json(records.into_iter().map(InsightView::from).collect()))
}

#[derive(Debug, Serialize)]
pub struct CycleView {
  pub subject_id: Uuid,
  pub ran_at:     DateTime<Utc>,
  pub status:     &'static str,
  pub message:    String,
  pub rules:      Vec<RuleSummary>,
}

/// `POST /subjects/:id/insights/recompute`
pub async fn recompute<S: EventStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<CycleView>, ApiError> {
  state.require_subject(id).await?;

  let scope = AnalysisScope::new(id, Utc::now());
  let report = run_cycle(&*state.store, &state.settings.rules, scope).await;
  Ok(Json(CycleView {
    subject_id: report.subject_id,
    ran_at:     report.ran_at,
    status:     report.status().as_str(),
    message:    report.message(),
    rules:      report.summaries(),
  }))
}
