//! In-memory `EventStore` used by the rule and orchestrator tests.

use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
  },
};

use chrono::{DateTime, TimeDelta, TimeZone as _, Utc};
use pawsight_core::{
  insight::{InsightCategory, InsightKey, InsightRecord, NewInsight, OnConflict},
  signal::{AudioEvent, ContextEvent, ContextLabel, HeartRateSample, NewContextEvent, Vocalization},
  store::{AudioQuery, ContextQuery, EventStore, InsightQuery, RangeQuery, StoreError},
  subject::{NewSubject, Subject},
};
use uuid::Uuid;

use crate::rules::AnalysisScope;

/// Reference instant every test timeline is built around.
pub fn at(offset_minutes: i64) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() + TimeDelta::minutes(offset_minutes)
}

/// Analysis three hours after the reference instant.
pub fn scope(store: &MemoryStore) -> AnalysisScope {
  AnalysisScope::new(store.subject_id, at(3 * 60))
}

#[derive(Debug, thiserror::Error)]
#[error("memory store: {message}")]
pub struct MemoryError {
  unavailable: bool,
  message:     &'static str,
}

impl StoreError for MemoryError {
  fn is_unavailable(&self) -> bool { self.unavailable }
}

/// Failure injection switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Fault {
  #[default]
  None,
  /// Every call reports the store as unreachable.
  Unreachable,
  /// Audio queries fail; everything else works.
  AudioQueries,
  /// Writes for this category fail; reads and other categories work.
  Upserts(InsightCategory),
}

#[derive(Default)]
struct Inner {
  hr:       Vec<HeartRateSample>,
  audio:    Vec<AudioEvent>,
  context:  Vec<ContextEvent>,
  insights: HashMap<InsightKey, InsightRecord>,
}

#[derive(Clone)]
pub struct MemoryStore {
  pub subject_id: Uuid,
  inner:          Arc<Mutex<Inner>>,
  fault:          Fault,
  reads:          Arc<AtomicUsize>,
  writes:         Arc<AtomicUsize>,
}

impl Default for MemoryStore {
  fn default() -> Self {
    Self {
      subject_id: Uuid::new_v4(),
      inner:      Arc::default(),
      fault:      Fault::None,
      reads:      Arc::default(),
      writes:     Arc::default(),
    }
  }
}

impl MemoryStore {
  pub fn with_fault(fault: Fault) -> Self { Self { fault, ..Self::default() } }

  pub fn hr(&self, timestamp: DateTime<Utc>, bpm: f64) {
    self.inner.lock().unwrap().hr.push(HeartRateSample {
      subject_id: self.subject_id,
      timestamp,
      bpm,
    });
  }

  pub fn audio(&self, kind: Vocalization, timestamp: DateTime<Utc>) {
    self.inner.lock().unwrap().audio.push(AudioEvent {
      subject_id: self.subject_id,
      timestamp,
      kind,
      confidence: 0.9,
    });
  }

  pub fn context(&self, label: ContextLabel, timestamp: DateTime<Utc>) {
    self.inner.lock().unwrap().context.push(ContextEvent {
      event_id: Uuid::new_v4(),
      subject_id: self.subject_id,
      timestamp,
      label,
      note: None,
    });
  }

  pub fn insight_count(&self) -> usize { self.inner.lock().unwrap().insights.len() }

  pub fn reads(&self) -> usize { self.reads.load(Ordering::SeqCst) }

  pub fn writes(&self) -> usize { self.writes.load(Ordering::SeqCst) }

  fn check(&self) -> Result<(), MemoryError> {
    match self.fault {
      Fault::Unreachable => Err(MemoryError { unavailable: true, message: "offline" }),
      _ => Ok(()),
    }
  }

  fn read(&self) -> Result<(), MemoryError> {
    self.check()?;
    self.reads.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }
}

fn in_range(range: &RangeQuery, subject_id: Uuid, ts: DateTime<Utc>) -> bool {
  subject_id == range.subject_id && range.contains(ts)
}

impl EventStore for MemoryStore {
  type Error = MemoryError;

  async fn ping(&self) -> Result<(), MemoryError> { self.check() }

  async fn add_subject(&self, input: NewSubject) -> Result<Subject, MemoryError> {
    self.check()?;
    Ok(Subject {
      subject_id: Uuid::new_v4(),
      name:       input.name,
      breed:      input.breed,
      created_at: Utc::now(),
    })
  }

  async fn get_subject(&self, _: Uuid) -> Result<Option<Subject>, MemoryError> {
    self.check()?;
    Ok(None)
  }

  async fn list_subjects(&self) -> Result<Vec<Subject>, MemoryError> {
    self.check()?;
    Ok(Vec::new())
  }

  async fn record_heart_rate(&self, samples: Vec<HeartRateSample>) -> Result<usize, MemoryError> {
    self.check()?;
    let n = samples.len();
    self.inner.lock().unwrap().hr.extend(samples);
    Ok(n)
  }

  async fn record_audio(&self, events: Vec<AudioEvent>) -> Result<usize, MemoryError> {
    self.check()?;
    let n = events.len();
    self.inner.lock().unwrap().audio.extend(events);
    Ok(n)
  }

  async fn record_context(&self, input: NewContextEvent) -> Result<ContextEvent, MemoryError> {
    self.check()?;
    let event = ContextEvent {
      event_id:   Uuid::new_v4(),
      subject_id: input.subject_id,
      timestamp:  input.timestamp,
      label:      input.label,
      note:       input.note,
    };
    self.inner.lock().unwrap().context.push(event.clone());
    Ok(event)
  }

  async fn heart_rate(&self, query: &RangeQuery) -> Result<Vec<HeartRateSample>, MemoryError> {
    self.read()?;
    let inner = self.inner.lock().unwrap();
    Ok(
      inner
        .hr
        .iter()
        .filter(|s| in_range(query, s.subject_id, s.timestamp))
        .cloned()
        .collect(),
    )
  }

  async fn audio_events(&self, query: &AudioQuery) -> Result<Vec<AudioEvent>, MemoryError> {
    self.read()?;
    if self.fault == Fault::AudioQueries {
      return Err(MemoryError { unavailable: false, message: "audio table corrupt" });
    }
    let inner = self.inner.lock().unwrap();
    Ok(
      inner
        .audio
        .iter()
        .filter(|e| in_range(&query.range, e.subject_id, e.timestamp))
        .filter(|e| query.kind.is_none_or(|k| k == e.kind))
        .cloned()
        .collect(),
    )
  }

  async fn context_events(&self, query: &ContextQuery) -> Result<Vec<ContextEvent>, MemoryError> {
    self.read()?;
    let inner = self.inner.lock().unwrap();
    Ok(
      inner
        .context
        .iter()
        .filter(|e| in_range(&query.range, e.subject_id, e.timestamp))
        .filter(|e| query.labels.is_empty() || query.labels.contains(&e.label))
        .cloned()
        .collect(),
    )
  }

  async fn upsert_insight(
    &self,
    key: InsightKey,
    insight: NewInsight,
    on_conflict: OnConflict,
  ) -> Result<InsightRecord, MemoryError> {
    self.check()?;
    self.writes.fetch_add(1, Ordering::SeqCst);
    if self.fault == Fault::Upserts(key.category) {
      return Err(MemoryError { unavailable: false, message: "insights table locked" });
    }
    let mut inner = self.inner.lock().unwrap();
    if on_conflict == OnConflict::Keep
      && let Some(existing) = inner.insights.get(&key)
    {
      return Ok(existing.clone());
    }
    let record = InsightRecord::from_parts(key, insight);
    inner.insights.insert(key, record.clone());
    Ok(record)
  }

  async fn list_insights(&self, query: &InsightQuery) -> Result<Vec<InsightRecord>, MemoryError> {
    self.read()?;
    let inner = self.inner.lock().unwrap();
    let mut records: Vec<InsightRecord> = inner
      .insights
      .values()
      .filter(|r| query.subject_id.is_none_or(|id| id == r.subject_id))
      .filter(|r| query.since.is_none_or(|s| r.computed_at >= s))
      .filter(|r| query.min_score.is_none_or(|m| r.score >= m))
      .cloned()
      .collect();
    records.sort_by(|a, b| b.computed_at.cmp(&a.computed_at));
    records.truncate(query.limit.unwrap_or(usize::MAX));
    Ok(records)
  }
}
