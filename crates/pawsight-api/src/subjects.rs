//! Handlers for `/subjects` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/subjects` | All registered dogs |
//! | `POST` | `/subjects` | Body: `{"name":"Biscuit","breed":"Beagle"}` |
//! | `GET`  | `/subjects/:id` | 404 if not found |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use pawsight_core::{
  store::EventStore,
  subject::{NewSubject, Subject},
};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// `GET /subjects`
pub async fn list<S: EventStore>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Subject>>, ApiError> {
  let subjects = state.store.list_subjects().await.map_err(ApiError::store)?;
  Ok(Json(subjects))
}

/// `POST /subjects`
pub async fn create<S: EventStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<NewSubject>,
) -> Result<impl IntoResponse, ApiError> {
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("name must not be empty".into()));
  }
  let subject = state.store.add_subject(body).await.map_err(ApiError::store)?;
  tracing::info!(subject_id = %subject.subject_id, "subject registered");
  Ok((StatusCode::CREATED, Json(subject)))
}

/// `GET /subjects/:id`
pub async fn get_one<S: EventStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Subject>, ApiError> {
  let subject = state
    .store
    .get_subject(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("subject {id} not found")))?;
  Ok(Json(subject))
}
