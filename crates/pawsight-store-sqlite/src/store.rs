//! [`SqliteStore`]: the SQLite implementation of [`EventStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use pawsight_core::{
  insight::{InsightKey, InsightRecord, NewInsight, OnConflict},
  signal::{AudioEvent, ContextEvent, HeartRateSample, NewContextEvent},
  store::{AudioQuery, ContextQuery, EventStore, InsightQuery, RangeQuery},
  subject::{NewSubject, Subject},
};

use crate::{
  Result,
  encode::{
    RawAudio, RawContext, RawHeartRate, RawInsight, RawSubject, decode_dt, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Pawsight store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store: useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Push bookkeeping ──────────────────────────────────────────────────────

  /// When an insight was last pushed for `subject_id`, if ever.
  pub async fn last_pushed_at(&self, subject_id: Uuid) -> Result<Option<DateTime<Utc>>> {
    let id_str = encode_uuid(subject_id);

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT last_pushed_at FROM push_state WHERE subject_id = ?1",
              rusqlite::params![id_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.as_deref().map(decode_dt).transpose()
  }

  pub async fn set_last_pushed_at(&self, subject_id: Uuid, at: DateTime<Utc>) -> Result<()> {
    let id_str = encode_uuid(subject_id);
    let at_str = encode_dt(at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO push_state (subject_id, last_pushed_at) VALUES (?1, ?2)
           ON CONFLICT(subject_id) DO UPDATE SET last_pushed_at = excluded.last_pushed_at",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// `(subject, since, until)` parameters shared by the range reads.
fn range_params(range: &RangeQuery) -> (String, String, Option<String>) {
  (encode_uuid(range.subject_id), encode_dt(range.since), range.until.map(encode_dt))
}

// ─── EventStore impl ─────────────────────────────────────────────────────────

impl EventStore for SqliteStore {
  type Error = crate::Error;

  async fn ping(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Subjects ──────────────────────────────────────────────────────────────

  async fn add_subject(&self, input: NewSubject) -> Result<Subject> {
    let subject = Subject {
      subject_id: Uuid::new_v4(),
      name:       input.name,
      breed:      input.breed,
      created_at: Utc::now(),
    };

    let id_str = encode_uuid(subject.subject_id);
    let name = subject.name.clone();
    let breed = subject.breed.clone();
    let at_str = encode_dt(subject.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO subjects (subject_id, name, breed, created_at) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name, breed, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(subject)
  }

  async fn get_subject(&self, id: Uuid) -> Result<Option<Subject>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSubject> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT subject_id, name, breed, created_at FROM subjects WHERE subject_id = ?1",
              rusqlite::params![id_str],
              RawSubject::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSubject::into_subject).transpose()
  }

  async fn list_subjects(&self) -> Result<Vec<Subject>> {
    let raws: Vec<RawSubject> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT subject_id, name, breed, created_at FROM subjects ORDER BY created_at",
        )?;
        let rows = stmt
          .query_map([], RawSubject::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubject::into_subject).collect()
  }

  // ── Telemetry: append-only writes ────────────────────────────────────────

  async fn record_heart_rate(&self, samples: Vec<HeartRateSample>) -> Result<usize> {
    for sample in &samples {
      sample.validate()?;
    }
    let rows: Vec<(String, String, f64)> = samples
      .iter()
      .map(|s| (encode_uuid(s.subject_id), encode_dt(s.timestamp), s.bpm))
      .collect();

    let n = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt =
            tx.prepare("INSERT INTO samples_hr (subject_id, ts, bpm) VALUES (?1, ?2, ?3)")?;
          for (subject_id, ts, bpm) in &rows {
            stmt.execute(rusqlite::params![subject_id, ts, bpm])?;
          }
        }
        tx.commit()?;
        Ok(rows.len())
      })
      .await?;

    tracing::debug!(count = n, "heart-rate samples stored");
    Ok(n)
  }

  async fn record_audio(&self, events: Vec<AudioEvent>) -> Result<usize> {
    for event in &events {
      event.validate()?;
    }
    let rows: Vec<(String, String, String, f64)> = events
      .iter()
      .map(|e| {
        (encode_uuid(e.subject_id), encode_dt(e.timestamp), e.kind.to_string(), e.confidence)
      })
      .collect();

    let n = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO events_audio (subject_id, ts, kind, confidence) VALUES (?1, ?2, ?3, ?4)",
          )?;
          for (subject_id, ts, kind, confidence) in &rows {
            stmt.execute(rusqlite::params![subject_id, ts, kind, confidence])?;
          }
        }
        tx.commit()?;
        Ok(rows.len())
      })
      .await?;

    tracing::debug!(count = n, "audio events stored");
    Ok(n)
  }

  async fn record_context(&self, input: NewContextEvent) -> Result<ContextEvent> {
    input.validate()?;
    let event = ContextEvent {
      event_id:   Uuid::new_v4(),
      subject_id: input.subject_id,
      timestamp:  input.timestamp,
      label:      input.label,
      note:       input.note,
    };

    let id_str = encode_uuid(event.event_id);
    let subject_str = encode_uuid(event.subject_id);
    let ts_str = encode_dt(event.timestamp);
    let label = event.label.as_ref().to_owned();
    let note = event.note.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO user_events (event_id, subject_id, ts, label, note)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, subject_str, ts_str, label, note],
        )?;
        Ok(())
      })
      .await?;

    Ok(event)
  }

  // ── Range reads ───────────────────────────────────────────────────────────

  async fn heart_rate(&self, query: &RangeQuery) -> Result<Vec<HeartRateSample>> {
    let (subject, since, until) = range_params(query);

    let raws: Vec<RawHeartRate> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT subject_id, ts, bpm FROM samples_hr
           WHERE subject_id = ?1 AND ts >= ?2 AND (?3 IS NULL OR ts < ?3)
           ORDER BY ts, rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![subject, since, until], RawHeartRate::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawHeartRate::into_sample).collect()
  }

  async fn audio_events(&self, query: &AudioQuery) -> Result<Vec<AudioEvent>> {
    let (subject, since, until) = range_params(&query.range);
    let kind = query.kind.map(|k| k.to_string());

    let raws: Vec<RawAudio> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT subject_id, ts, kind, confidence FROM events_audio
           WHERE subject_id = ?1 AND ts >= ?2 AND (?3 IS NULL OR ts < ?3)
             AND (?4 IS NULL OR kind = ?4)
           ORDER BY ts, rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![subject, since, until, kind], RawAudio::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAudio::into_event).collect()
  }

  async fn context_events(&self, query: &ContextQuery) -> Result<Vec<ContextEvent>> {
    let (subject, since, until) = range_params(&query.range);
    let labels: Vec<String> = query.labels.iter().map(|l| l.as_ref().to_owned()).collect();

    let raws: Vec<RawContext> = self
      .conn
      .call(move |conn| {
        // Labels follow the three fixed parameters as ?4, ?5, ...
        let label_clause = if labels.is_empty() {
          String::new()
        } else {
          let slots: Vec<String> = (0..labels.len()).map(|i| format!("?{}", i + 4)).collect();
          format!("AND label IN ({})", slots.join(", "))
        };
        let sql = format!(
          "SELECT event_id, subject_id, ts, label, note FROM user_events
           WHERE subject_id = ?1 AND ts >= ?2 AND (?3 IS NULL OR ts < ?3)
           {label_clause}
           ORDER BY ts, rowid"
        );

        let mut params: Vec<Box<dyn rusqlite::ToSql>> =
          vec![Box::new(subject), Box::new(since), Box::new(until)];
        params.extend(labels.into_iter().map(|l| Box::new(l) as Box<dyn rusqlite::ToSql>));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawContext::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContext::into_event).collect()
  }

  // ── Insights ──────────────────────────────────────────────────────────────

  async fn upsert_insight(
    &self,
    key: InsightKey,
    insight: NewInsight,
    on_conflict: OnConflict,
  ) -> Result<InsightRecord> {
    let subject = encode_uuid(key.subject_id);
    let category = key.category.as_ref().to_owned();
    let computed_at = encode_dt(insight.computed_at);
    let details = serde_json::to_string(&insight.details)?;
    let summary = insight.summary;
    let score = insight.score;

    let conflict_clause = match on_conflict {
      OnConflict::Replace => {
        "DO UPDATE SET
           computed_at = excluded.computed_at,
           summary     = excluded.summary,
           score       = excluded.score,
           details     = excluded.details"
      }
      OnConflict::Keep => "DO NOTHING",
    };

    let raw: RawInsight = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          &format!(
            "INSERT INTO insights (subject_id, category, computed_at, summary, score, details)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(subject_id, category) {conflict_clause}"
          ),
          rusqlite::params![subject, category, computed_at, summary, score, details],
        )?;
        let raw = tx.query_row(
          &format!(
            "SELECT {} FROM insights WHERE subject_id = ?1 AND category = ?2",
            RawInsight::COLUMNS
          ),
          rusqlite::params![subject, category],
          RawInsight::from_row,
        )?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_record()
  }

  async fn list_insights(&self, query: &InsightQuery) -> Result<Vec<InsightRecord>> {
    let subject = query.subject_id.map(encode_uuid);
    let since = query.since.map(encode_dt);
    let min_score = query.min_score;
    // SQLite treats a negative LIMIT as unbounded.
    let limit = query.limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));

    let raws: Vec<RawInsight> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM insights
           WHERE (?1 IS NULL OR subject_id = ?1)
             AND (?2 IS NULL OR computed_at >= ?2)
             AND (?3 IS NULL OR score >= ?3)
           ORDER BY computed_at DESC, score DESC, category
           LIMIT ?4",
          RawInsight::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![subject, since, min_score, limit], RawInsight::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawInsight::into_record).collect()
  }
}
