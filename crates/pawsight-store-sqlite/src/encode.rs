//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with a fixed microsecond
//! precision. Enums are stored by their display label. UUIDs are stored as
//! hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use pawsight_core::{
  insight::{InsightCategory, InsightRecord},
  signal::{AudioEvent, ContextEvent, ContextLabel, HeartRateSample, Vocalization},
  subject::Subject,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `subjects` row.
pub struct RawSubject {
  pub subject_id: String,
  pub name:       String,
  pub breed:      Option<String>,
  pub created_at: String,
}

impl RawSubject {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_id: row.get(0)?,
      name:       row.get(1)?,
      breed:      row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      subject_id: decode_uuid(&self.subject_id)?,
      name:       self.name,
      breed:      self.breed,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read from a `samples_hr` row.
pub struct RawHeartRate {
  pub subject_id: String,
  pub ts:         String,
  pub bpm:        f64,
}

impl RawHeartRate {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { subject_id: row.get(0)?, ts: row.get(1)?, bpm: row.get(2)? })
  }

  pub fn into_sample(self) -> Result<HeartRateSample> {
    Ok(HeartRateSample {
      subject_id: decode_uuid(&self.subject_id)?,
      timestamp:  decode_dt(&self.ts)?,
      bpm:        self.bpm,
    })
  }
}

/// Raw values read from an `events_audio` row.
pub struct RawAudio {
  pub subject_id: String,
  pub ts:         String,
  pub kind:       String,
  pub confidence: f64,
}

impl RawAudio {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_id: row.get(0)?,
      ts:         row.get(1)?,
      kind:       row.get(2)?,
      confidence: row.get(3)?,
    })
  }

  pub fn into_event(self) -> Result<AudioEvent> {
    Ok(AudioEvent {
      subject_id: decode_uuid(&self.subject_id)?,
      timestamp:  decode_dt(&self.ts)?,
      kind:       Vocalization::parse(&self.kind)?,
      confidence: self.confidence,
    })
  }
}

/// Raw values read from a `user_events` row.
pub struct RawContext {
  pub event_id:   String,
  pub subject_id: String,
  pub ts:         String,
  pub label:      String,
  pub note:       Option<String>,
}

impl RawContext {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:   row.get(0)?,
      subject_id: row.get(1)?,
      ts:         row.get(2)?,
      label:      row.get(3)?,
      note:       row.get(4)?,
    })
  }

  pub fn into_event(self) -> Result<ContextEvent> {
    Ok(ContextEvent {
      event_id:   decode_uuid(&self.event_id)?,
      subject_id: decode_uuid(&self.subject_id)?,
      timestamp:  decode_dt(&self.ts)?,
      label:      ContextLabel::parse(&self.label)?,
      note:       self.note,
    })
  }
}

/// Raw values read from an `insights` row.
pub struct RawInsight {
  pub subject_id:  String,
  pub category:    String,
  pub computed_at: String,
  pub summary:     String,
  pub score:       f64,
  pub details:     String,
}

impl RawInsight {
  pub const COLUMNS: &'static str = "subject_id, category, computed_at, summary, score, details";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_id:  row.get(0)?,
      category:    row.get(1)?,
      computed_at: row.get(2)?,
      summary:     row.get(3)?,
      score:       row.get(4)?,
      details:     row.get(5)?,
    })
  }

  pub fn into_record(self) -> Result<InsightRecord> {
    Ok(InsightRecord {
      subject_id:  decode_uuid(&self.subject_id)?,
      category:    InsightCategory::parse(&self.category)?,
      computed_at: decode_dt(&self.computed_at)?,
      summary:     self.summary,
      score:       self.score,
      details:     serde_json::from_str(&self.details)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeDelta, TimeZone as _};

  use super::*;

  #[test]
  fn encoded_timestamps_sort_as_text() {
    let base = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    let a = encode_dt(base);
    let b = encode_dt(base + TimeDelta::microseconds(1));
    let c = encode_dt(base + TimeDelta::seconds(1));
    assert_eq!(a, "2025-03-01T12:00:00.000000Z");
    assert!(a < b && b < c);
    assert_eq!(decode_dt(&b).unwrap(), base + TimeDelta::microseconds(1));
  }
}
