//! JSON REST API for Pawsight.
//!
//! Exposes an axum [`Router`] backed by any [`pawsight_core::store::EventStore`]:
//! subject registration, telemetry ingestion and range reads, context-event
//! logging, insight listing and on-demand recomputation. TLS and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", pawsight_api::api_router(store.clone(), settings))
//! ```

pub mod auth;
pub mod error;
pub mod events;
pub mod insights;
pub mod subjects;
pub mod telemetry;

use std::sync::Arc;

use axum::{
  Router, middleware,
  routing::{get, post},
};
use chrono::{DateTime, TimeDelta, Utc};
use pawsight_core::store::{EventStore, RangeQuery};
use pawsight_insights::RuleConfig;
use uuid::Uuid;

pub use error::ApiError;

/// Largest telemetry batch accepted in one request.
pub const DEFAULT_MAX_BATCH: usize = 200;

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ApiSettings {
  pub max_batch:  usize,
  /// Argon2 PHC hash of the bearer token. `None` disables auth.
  pub token_hash: Option<String>,
  /// Used by recompute and for local-hour histograms.
  pub rules:      RuleConfig,
}

impl Default for ApiSettings {
  fn default() -> Self {
    Self { max_batch: DEFAULT_MAX_BATCH, token_hash: None, rules: RuleConfig::default() }
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
#[derive(Clone)]
pub struct AppState<S> {
  pub store:    Arc<S>,
  pub settings: Arc<ApiSettings>,
}

impl<S: EventStore> AppState<S> {
  /// 404 unless `id` names a registered subject.
  async fn require_subject(&self, id: Uuid) -> Result<(), ApiError> {
    self
      .store
      .get_subject(id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::NotFound(format!("subject {id} not found")))?;
    Ok(())
  }
}

/// `[since, until)` for a read endpoint, defaulting to the last day.
fn read_range(
  subject_id: Uuid,
  since: Option<DateTime<Utc>>,
  until: Option<DateTime<Utc>>,
) -> RangeQuery {
  let since = since.unwrap_or_else(|| Utc::now() - TimeDelta::hours(24));
  let range = RangeQuery::since(subject_id, since);
  match until {
    Some(until) => range.until(until),
    None => range,
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, settings: ApiSettings) -> Router<()>
where
  S: EventStore + Clone + 'static,
{
  let settings = Arc::new(settings);
  let state = AppState { store, settings: settings.clone() };

  let mut router = Router::new()
    // Subjects
    .route("/subjects", get(subjects::list::<S>).post(subjects::create::<S>))
    .route("/subjects/{id}", get(subjects::get_one::<S>))
    // Telemetry
    .route(
      "/subjects/{id}/heart-rate",
      get(telemetry::heart_rate::<S>).post(telemetry::ingest_heart_rate::<S>),
    )
    .route(
      "/subjects/{id}/audio",
      get(telemetry::audio::<S>).post(telemetry::ingest_audio::<S>),
    )
    // Context events
    .route("/subjects/{id}/events", get(events::list::<S>).post(events::create::<S>))
    // Insights
    .route("/subjects/{id}/insights", get(insights::list::<S>))
    .route("/subjects/{id}/insights/recompute", post(insights::recompute::<S>));

  if settings.token_hash.is_some() {
    router = router.route_layer(middleware::from_fn_with_state(settings, auth::require_bearer));
  }

  router.with_state(state)
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use chrono::TimeZone as _;
  use pawsight_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use super::*;

  async fn app() -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    api_router(Arc::new(store), ApiSettings::default())
  }

  async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
  }

  async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  async fn create_dog(app: &Router) -> String {
    let resp = send(app, "POST", "/subjects", Some(json!({"name": "Biscuit"}))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    json_body(resp).await["subject_id"].as_str().unwrap().to_owned()
  }

  fn ago(minutes: i64) -> String {
    (Utc::now() - TimeDelta::minutes(minutes)).to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
  }

  #[tokio::test]
  async fn subject_lifecycle() {
    let app = app().await;
    let id = create_dog(&app).await;

    let resp = send(&app, "GET", &format!("/subjects/{id}"), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["name"], "Biscuit");

    let resp = send(&app, "GET", "/subjects", None).await;
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 1);

    let missing = Uuid::new_v4();
    let resp = send(&app, "GET", &format!("/subjects/{missing}"), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn heart_rate_ingest_and_summary() {
    let app = app().await;
    let id = create_dog(&app).await;
    let batch = json!([
      {"timestamp": ago(30), "bpm": 80.0},
      {"timestamp": ago(20), "bpm": 100.0},
      {"timestamp": ago(10), "bpm": 90.0},
    ]);

    let resp = send(&app, "POST", &format!("/subjects/{id}/heart-rate"), Some(batch)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(json_body(resp).await["stored"], 3);

    let resp = send(&app, "GET", &format!("/subjects/{id}/heart-rate"), None).await;
    let body = json_body(resp).await;
    assert_eq!(body["samples"].as_array().unwrap().len(), 3);
    assert_eq!(body["summary"]["min"], 80.0);
    assert_eq!(body["summary"]["max"], 100.0);
    assert_eq!(body["summary"]["mean"], 90.0);
  }

  #[tokio::test]
  async fn oversized_or_invalid_batches_are_rejected() {
    let app = app().await;
    let id = create_dog(&app).await;

    let big: Vec<Value> = (0..201).map(|_| json!({"timestamp": ago(1), "bpm": 80.0})).collect();
    let resp = send(&app, "POST", &format!("/subjects/{id}/heart-rate"), Some(json!(big))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let bad = json!([{"timestamp": ago(1), "bpm": 0.0}]);
    let resp = send(&app, "POST", &format!("/subjects/{id}/heart-rate"), Some(bad)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let missing = Uuid::new_v4();
    let ok = json!([{"timestamp": ago(1), "bpm": 80.0}]);
    let resp = send(&app, "POST", &format!("/subjects/{missing}/heart-rate"), Some(ok)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn reads_for_unknown_subject_are_not_found() {
    let app = app().await;
    create_dog(&app).await;
    let missing = Uuid::new_v4();

    for path in ["heart-rate", "audio", "events", "insights"] {
      let resp = send(&app, "GET", &format!("/subjects/{missing}/{path}"), None).await;
      assert_eq!(resp.status(), StatusCode::NOT_FOUND, "GET {path}");
      assert!(json_body(resp).await["error"].is_string());
    }
  }

  #[tokio::test]
  async fn five_digit_year_is_rejected() {
    let app = app().await;
    let id = create_dog(&app).await;
    let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();

    let batch = json!([{"timestamp": far, "bpm": 80.0}]);
    let resp = send(&app, "POST", &format!("/subjects/{id}/heart-rate"), Some(batch)).await;
    assert!(resp.status().is_client_error(), "{}", resp.status());

    let event = json!({"label": "Car", "timestamp": far});
    let resp = send(&app, "POST", &format!("/subjects/{id}/events"), Some(event)).await;
    assert!(resp.status().is_client_error(), "{}", resp.status());

    let resp = send(&app, "GET", &format!("/subjects/{id}/events?since=2025-01-01T00:00:00Z"), None).await;
    assert!(json_body(resp).await.as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn audio_defaults_confidence_and_builds_histogram() {
    let app = app().await;
    let id = create_dog(&app).await;
    let batch = json!([
      {"timestamp": ago(5), "kind": "bark"},
      {"timestamp": ago(4), "kind": "whine", "confidence": 0.6},
    ]);

    let resp = send(&app, "POST", &format!("/subjects/{id}/audio"), Some(batch)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(&app, "GET", &format!("/subjects/{id}/audio?kind=bark"), None).await;
    let body = json_body(resp).await;
    let events = body["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["confidence"], 0.8);
    let hourly: Vec<u64> =
      body["hourly"].as_array().unwrap().iter().map(|v| v.as_u64().unwrap()).collect();
    assert_eq!(hourly.len(), 24);
    assert_eq!(hourly.iter().sum::<u64>(), 1);
  }

  #[tokio::test]
  async fn recompute_then_list_insights() {
    let app = app().await;
    let id = create_dog(&app).await;

    let resp = send(
      &app,
      "POST",
      &format!("/subjects/{id}/events"),
      Some(json!({"label": "Car", "timestamp": ago(120)})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(json_body(resp).await["label"], "Car");

    let barks: Vec<Value> =
      (0..5).map(|i| json!({"timestamp": ago(119 - i * 5), "kind": "bark"})).collect();
    send(&app, "POST", &format!("/subjects/{id}/audio"), Some(json!(barks))).await;

    let resp = send(&app, "POST", &format!("/subjects/{id}/insights/recompute"), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let report = json_body(resp).await;
    assert_eq!(report["status"], "new_insights");
    assert_eq!(report["rules"].as_array().unwrap().len(), 7);

    let resp = send(&app, "GET", &format!("/subjects/{id}/insights"), None).await;
    let insights = json_body(resp).await;
    let insights = insights.as_array().unwrap();
    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0]["category"], "car_bark_risk");
    assert_eq!(insights[0]["severity"], "high");
  }

  #[tokio::test]
  async fn events_filter_by_label() {
    let app = app().await;
    let id = create_dog(&app).await;
    for label in ["Park", "Dog Seen", "Park"] {
      send(&app, "POST", &format!("/subjects/{id}/events"), Some(json!({"label": label}))).await;
    }

    let resp = send(&app, "GET", &format!("/subjects/{id}/events?label=Park"), None).await;
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 2);

    let resp = send(&app, "GET", &format!("/subjects/{id}/events"), None).await;
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 3);
  }
}
