//! SQL schema for the Pawsight SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision for future migrations.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Timestamps are fixed-width RFC 3339 UTC strings, so `<`/`>=` on the text
/// column orders them chronologically.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS subjects (
    subject_id  TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    breed       TEXT,
    created_at  TEXT NOT NULL
);

-- Telemetry tables are append-only. Duplicates are tolerated.
CREATE TABLE IF NOT EXISTS samples_hr (
    subject_id  TEXT NOT NULL REFERENCES subjects(subject_id),
    ts          TEXT NOT NULL,
    bpm         REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS events_audio (
    subject_id  TEXT NOT NULL REFERENCES subjects(subject_id),
    ts          TEXT NOT NULL,
    kind        TEXT NOT NULL,   -- 'bark' | 'whine'
    confidence  REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS user_events (
    event_id    TEXT PRIMARY KEY,
    subject_id  TEXT NOT NULL REFERENCES subjects(subject_id),
    ts          TEXT NOT NULL,
    label       TEXT NOT NULL,   -- preset label, e.g. 'Dog Seen'
    note        TEXT
);

-- One live insight per (subject, category); recomputation overwrites.
CREATE TABLE IF NOT EXISTS insights (
    subject_id   TEXT NOT NULL REFERENCES subjects(subject_id),
    category     TEXT NOT NULL,
    computed_at  TEXT NOT NULL,
    summary      TEXT NOT NULL,
    score        REAL NOT NULL,
    details      TEXT NOT NULL DEFAULT '{}',
    UNIQUE (subject_id, category)
);

CREATE TABLE IF NOT EXISTS push_state (
    subject_id      TEXT PRIMARY KEY REFERENCES subjects(subject_id),
    last_pushed_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS samples_hr_subject_ts_idx   ON samples_hr(subject_id, ts);
CREATE INDEX IF NOT EXISTS events_audio_subject_ts_idx ON events_audio(subject_id, ts);
CREATE INDEX IF NOT EXISTS user_events_subject_ts_idx  ON user_events(subject_id, ts);
CREATE INDEX IF NOT EXISTS insights_computed_idx       ON insights(computed_at);

PRAGMA user_version = 1;
";
