//! Handlers for wearable telemetry: heart-rate samples and classified
//! vocalizations.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/subjects/:id/heart-rate` | Body: `[{"timestamp":..,"bpm":..}]`, at most `max_batch` |
//! | `GET`  | `/subjects/:id/heart-rate` | `?since&until`; samples plus min/max/mean |
//! | `POST` | `/subjects/:id/audio` | Body: `[{"timestamp":..,"kind":"bark","confidence":0.9}]` |
//! | `GET`  | `/subjects/:id/audio` | `?since&until&kind`; events plus per-hour counts |
//!
//! A batch is validated as a whole: one bad record rejects the request and
//! nothing is stored.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use pawsight_core::{
  signal::{AudioEvent, DEFAULT_AUDIO_CONFIDENCE, HeartRateSample, Vocalization},
  store::{AudioQuery, EventStore},
};
use pawsight_insights::summary::{HeartRateSummary, heart_rate_summary, hourly_vocalizations};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{AppState, error::ApiError, read_range};

fn check_batch_size(len: usize, max: usize) -> Result<(), ApiError> {
  if len > max {
    return Err(ApiError::BadRequest(format!("batch of {len} exceeds the limit of {max}")));
  }
  Ok(())
}

// ─── Heart rate ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct HeartRateInput {
  pub timestamp: DateTime<Utc>,
  pub bpm:       f64,
}

/// `POST /subjects/:id/heart-rate`
pub async fn ingest_heart_rate<S: EventStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Json(batch): Json<Vec<HeartRateInput>>,
) -> Result<impl IntoResponse, ApiError> {
  check_batch_size(batch.len(), state.settings.max_batch)?;
  state.require_subject(id).await?;

  let samples: Vec<HeartRateSample> = batch
    .into_iter()
    .map(|s| HeartRateSample { subject_id: id, timestamp: s.timestamp, bpm: s.bpm })
    .collect();
  for sample in &samples {
    sample.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
  }

  let stored = state.store.record_heart_rate(samples).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(json!({ "stored": stored }))))
}

#[derive(Debug, Deserialize)]
pub struct RangeParams {
  pub since: Option<DateTime<Utc>>,
  pub until: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct HeartRateView {
  pub samples: Vec<HeartRateSample>,
  pub summary: Option<HeartRateSummary>,
}

/// `GET /subjects/:id/heart-rate[?since=..][&until=..]`
pub async fn heart_rate<S: EventStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<RangeParams>,
) -> Result<Json<HeartRateView>, ApiError> {
  state.require_subject(id).await?;

  let range = read_range(id, params.since, params.until);
  let samples = state.store.heart_rate(&range).await.map_err(ApiError::store)?;
  let summary = heart_rate_summary(&samples);
  Ok(Json(HeartRateView { samples, summary }))
}

// ─── Audio ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AudioInput {
  pub timestamp:  DateTime<Utc>,
  pub kind:       Vocalization,
  pub confidence: Option<f64>,
}

/// `POST /subjects/:id/audio`
pub async fn ingest_audio<S: EventStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Json(batch): Json<Vec<AudioInput>>,
) -> Result<impl IntoResponse, ApiError> {
  check_batch_size(batch.len(), state.settings.max_batch)?;
  state.require_subject(id).await?;

  let events: Vec<AudioEvent> = batch
    .into_iter()
    .map(|e| AudioEvent {
      subject_id: id,
      timestamp:  e.timestamp,
      kind:       e.kind,
      confidence: e.confidence.unwrap_or(DEFAULT_AUDIO_CONFIDENCE),
    })
    .collect();
  for event in &events {
    event.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
  }

  let stored = state.store.record_audio(events).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(json!({ "stored": stored }))))
}

#[derive(Debug, Deserialize)]
pub struct AudioParams {
  pub since: Option<DateTime<Utc>>,
  pub until: Option<DateTime<Utc>>,
  pub kind:  Option<Vocalization>,
}

#[derive(Debug, Serialize)]
pub struct AudioView {
  pub events: Vec<AudioEvent>,
  /// Counts by local hour of day, index 0 = midnight.
  pub hourly: [u32; 24],
}

/// `GET /subjects/:id/audio[?since=..][&until=..][&kind=bark|whine]`
pub async fn audio<S: EventStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<AudioParams>,
) -> Result<Json<AudioView>, ApiError> {
  state.require_subject(id).await?;

  let query = AudioQuery { range: read_range(id, params.since, params.until), kind: params.kind };
  let events = state.store.audio_events(&query).await.map_err(ApiError::store)?;
  let hourly = hourly_vocalizations(&events, state.settings.rules.utc_offset());
  Ok(Json(AudioView { events, hourly }))
}
