//! Handlers for user-logged context events.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/subjects/:id/events` | Body: `{"label":"Dog Seen","note":"..","timestamp":..}`; timestamp defaults to now |
//! | `GET`  | `/subjects/:id/events` | `?since&label` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use pawsight_core::{
  signal::{ContextEvent, ContextLabel, NewContextEvent},
  store::{ContextQuery, EventStore},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError, read_range};

#[derive(Debug, Deserialize)]
pub struct NewEventBody {
  pub label:     ContextLabel,
  pub note:      Option<String>,
  pub timestamp: Option<DateTime<Utc>>,
}

/// `POST /subjects/:id/events`
pub async fn create<S: EventStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<NewEventBody>,
) -> Result<impl IntoResponse, ApiError> {
  state.require_subject(id).await?;

  let input = NewContextEvent {
    subject_id: id,
    timestamp:  body.timestamp.unwrap_or_else(Utc::now),
    label:      body.label,
    note:       body.note.filter(|n| !n.trim().is_empty()),
  };
  input.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
  let event = state.store.record_context(input).await.map_err(ApiError::store)?;
  tracing::info!(subject_id = %id, label = %event.label, "context event logged");
  Ok((StatusCode::CREATED, Json(event)))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub since: Option<DateTime<Utc>>,
  pub label: Option<ContextLabel>,
}

/// `GET /subjects/:id/events[?since=..][&label=..]`
pub async fn list<S: EventStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<ContextEvent>>, ApiError> {
  state.require_subject(id).await?;

  let query = ContextQuery {
    range:  read_range(id, params.since, None),
    labels: params.label.into_iter().collect(),
  };
  let events = state.store.context_events(&query).await.map_err(ApiError::store)?;
  Ok(Json(events))
}
