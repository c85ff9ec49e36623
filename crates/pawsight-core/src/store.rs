//! The `EventStore` trait and supporting query types.
//!
//! One trait covers both the append-only telemetry streams and the insight
//! table, because both live in the same datastore. The rule engine
//! (`pawsight-insights`), the HTTP layer (`pawsight-api`) and the server
//! depend on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  insight::{InsightKey, InsightRecord, NewInsight, OnConflict},
  signal::{AudioEvent, ContextEvent, ContextLabel, HeartRateSample, NewContextEvent, Vocalization},
  subject::{NewSubject, Subject},
};

// ─── Error classification ────────────────────────────────────────────────────

/// Backend errors must say whether the store itself is unreachable.
///
/// Callers degrade an unreachable store to "no data source" rather than
/// treating it as a failed query.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn is_unavailable(&self) -> bool;
}

impl StoreError for std::convert::Infallible {
  fn is_unavailable(&self) -> bool { match *self {} }
}

// ─── Query types ─────────────────────────────────────────────────────────────

/// A time range for one subject. `since` is inclusive, `until` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeQuery {
  pub subject_id: Uuid,
  pub since:      DateTime<Utc>,
  pub until:      Option<DateTime<Utc>>,
}

impl RangeQuery {
  pub fn since(subject_id: Uuid, since: DateTime<Utc>) -> Self {
    Self { subject_id, since, until: None }
  }

  pub fn until(mut self, until: DateTime<Utc>) -> Self {
    self.until = Some(until);
    self
  }

  /// Whether `ts` falls inside this range.
  pub fn contains(&self, ts: DateTime<Utc>) -> bool {
    ts >= self.since && self.until.is_none_or(|u| ts < u)
  }
}

/// Parameters for [`EventStore::audio_events`].
#[derive(Debug, Clone, Copy)]
pub struct AudioQuery {
  pub range: RangeQuery,
  /// Restrict to one vocalization kind; `None` returns both.
  pub kind:  Option<Vocalization>,
}

/// Parameters for [`EventStore::context_events`].
#[derive(Debug, Clone)]
pub struct ContextQuery {
  pub range:  RangeQuery,
  /// Any of these labels matches. Empty means no label filter.
  pub labels: Vec<ContextLabel>,
}

/// Parameters for [`EventStore::list_insights`].
#[derive(Debug, Clone, Default)]
pub struct InsightQuery {
  pub subject_id: Option<Uuid>,
  /// Lower bound (inclusive) on `computed_at`.
  pub since:      Option<DateTime<Utc>>,
  pub min_score:  Option<f64>,
  pub limit:      Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the Pawsight datastore.
///
/// Telemetry writes are append-only. Insight writes go through
/// [`EventStore::upsert_insight`], keyed by `(subject_id, category)`, so the
/// store itself enforces at most one live record per key.
///
/// All range reads return records ascending by timestamp.
pub trait EventStore: Send + Sync {
  type Error: StoreError;

  /// Cheap reachability check.
  fn ping(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Subjects ──────────────────────────────────────────────────────────

  fn add_subject(
    &self,
    input: NewSubject,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + '_;

  /// Retrieve a subject by UUID. Returns `None` if not found.
  fn get_subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + '_;

  fn list_subjects(&self) -> impl Future<Output = Result<Vec<Subject>, Self::Error>> + Send + '_;

  // ── Telemetry: append-only writes ────────────────────────────────────

  /// Append a batch of heart-rate samples. Returns the number stored.
  fn record_heart_rate(
    &self,
    samples: Vec<HeartRateSample>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Append a batch of audio events. Returns the number stored.
  fn record_audio(
    &self,
    events: Vec<AudioEvent>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Record a user-logged context event; the store assigns its id.
  fn record_context(
    &self,
    input: NewContextEvent,
  ) -> impl Future<Output = Result<ContextEvent, Self::Error>> + Send + '_;

  // ── Range reads ───────────────────────────────────────────────────────

  fn heart_rate<'a>(
    &'a self,
    query: &'a RangeQuery,
  ) -> impl Future<Output = Result<Vec<HeartRateSample>, Self::Error>> + Send + 'a;

  fn audio_events<'a>(
    &'a self,
    query: &'a AudioQuery,
  ) -> impl Future<Output = Result<Vec<AudioEvent>, Self::Error>> + Send + 'a;

  fn context_events<'a>(
    &'a self,
    query: &'a ContextQuery,
  ) -> impl Future<Output = Result<Vec<ContextEvent>, Self::Error>> + Send + 'a;

  // ── Insights ──────────────────────────────────────────────────────────

  /// Write `insight` under `key`. With [`OnConflict::Replace`] an existing
  /// record for the key is overwritten; with [`OnConflict::Keep`] it is left
  /// alone. Returns the record now stored under the key.
  fn upsert_insight(
    &self,
    key: InsightKey,
    insight: NewInsight,
    on_conflict: OnConflict,
  ) -> impl Future<Output = Result<InsightRecord, Self::Error>> + Send + '_;

  /// Insights matching `query`, newest `computed_at` first.
  fn list_insights<'a>(
    &'a self,
    query: &'a InsightQuery,
  ) -> impl Future<Output = Result<Vec<InsightRecord>, Self::Error>> + Send + 'a;
}
