//! The three telemetry streams: heart-rate samples, audio events and
//! user-logged context events.
//!
//! Samples and audio events arrive from the wearable and are immutable once
//! stored. Duplicates are tolerated; no uniqueness is enforced. Context
//! events are created only by explicit user action.

use chrono::{DateTime, Datelike as _, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

/// Upper bound on a physiologically plausible canine heart rate.
pub const MAX_BPM: f64 = 400.0;

/// Confidence assigned to audio events whose device omitted one.
pub const DEFAULT_AUDIO_CONFIDENCE: f64 = 0.8;

/// Timestamps are stored as text and compared lexically, which only orders
/// correctly for four-digit years.
fn check_timestamp(timestamp: DateTime<Utc>) -> Result<()> {
  if !(0..=9999).contains(&timestamp.year()) {
    return Err(Error::InvalidSample(format!(
      "timestamp {timestamp} outside years 0000-9999"
    )));
  }
  Ok(())
}

// ─── Heart rate ──────────────────────────────────────────────────────────────

/// A single heart-rate reading from the wearable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateSample {
  pub subject_id: Uuid,
  pub timestamp:  DateTime<Utc>,
  pub bpm:        f64,
}

impl HeartRateSample {
  pub fn validate(&self) -> Result<()> {
    check_timestamp(self.timestamp)?;
    if !self.bpm.is_finite() || self.bpm <= 0.0 || self.bpm > MAX_BPM {
      return Err(Error::InvalidSample(format!(
        "bpm {} outside (0, {MAX_BPM}]",
        self.bpm
      )));
    }
    Ok(())
  }
}

// ─── Audio ───────────────────────────────────────────────────────────────────

/// The upstream classifier's decision for a vocalization.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Vocalization {
  Bark,
  Whine,
}

impl Vocalization {
  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownVocalization(s.to_owned()))
  }
}

/// A classified bark or whine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioEvent {
  pub subject_id: Uuid,
  pub timestamp:  DateTime<Utc>,
  pub kind:       Vocalization,
  /// Classifier confidence in `[0, 1]`.
  pub confidence: f64,
}

impl AudioEvent {
  pub fn validate(&self) -> Result<()> {
    check_timestamp(self.timestamp)?;
    if !(0.0..=1.0).contains(&self.confidence) {
      return Err(Error::InvalidSample(format!(
        "confidence {} outside [0, 1]",
        self.confidence
      )));
    }
    Ok(())
  }
}

// ─── Context events ──────────────────────────────────────────────────────────

/// The fixed preset vocabulary offered to the user when logging an event.
///
/// The serialised form is the human-readable label, e.g. `"Dog Seen"`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
pub enum ContextLabel {
  Car,
  Park,
  Toy,
  Play,
  #[serde(rename = "New Person")]
  #[strum(serialize = "New Person")]
  NewPerson,
  #[serde(rename = "Dog Seen")]
  #[strum(serialize = "Dog Seen")]
  DogSeen,
  Relaxing,
}

impl ContextLabel {
  pub const ALL: [Self; 7] = [
    Self::Car,
    Self::Park,
    Self::Toy,
    Self::Play,
    Self::NewPerson,
    Self::DogSeen,
    Self::Relaxing,
  ];

  /// Parse the stored/wire label, mapping failures into the core error.
  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownLabel(s.to_owned()))
  }
}

/// A user-logged occurrence used as the temporal anchor for correlation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEvent {
  pub event_id:   Uuid,
  pub subject_id: Uuid,
  pub timestamp:  DateTime<Utc>,
  pub label:      ContextLabel,
  pub note:       Option<String>,
}

/// Input to [`crate::store::EventStore::record_context`]. The store assigns
/// the `event_id`.
#[derive(Debug, Clone)]
pub struct NewContextEvent {
  pub subject_id: Uuid,
  pub timestamp:  DateTime<Utc>,
  pub label:      ContextLabel,
  pub note:       Option<String>,
}

impl NewContextEvent {
  pub fn new(subject_id: Uuid, timestamp: DateTime<Utc>, label: ContextLabel) -> Self {
    Self { subject_id, timestamp, label, note: None }
  }

  pub fn validate(&self) -> Result<()> { check_timestamp(self.timestamp) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn labels_round_trip_through_their_display_form() {
    for label in ContextLabel::ALL {
      assert_eq!(ContextLabel::parse(&label.to_string()).unwrap(), label);
    }
    assert_eq!(ContextLabel::DogSeen.as_ref(), "Dog Seen");
    assert_eq!(
      serde_json::to_string(&ContextLabel::NewPerson).unwrap(),
      "\"New Person\""
    );
  }

  #[test]
  fn unknown_label_is_rejected() {
    assert!(matches!(
      ContextLabel::parse("Bath"),
      Err(Error::UnknownLabel(l)) if l == "Bath"
    ));
  }

  #[test]
  fn heart_rate_validation() {
    let mut s = HeartRateSample {
      subject_id: Uuid::new_v4(),
      timestamp:  Utc::now(),
      bpm:        88.0,
    };
    assert!(s.validate().is_ok());
    s.bpm = f64::NAN;
    assert!(s.validate().is_err());
    s.bpm = 0.0;
    assert!(s.validate().is_err());
    s.bpm = 401.0;
    assert!(s.validate().is_err());
  }

  #[test]
  fn five_digit_years_are_rejected() {
    use chrono::TimeZone as _;

    let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
    let id = Uuid::new_v4();

    let sample = HeartRateSample { subject_id: id, timestamp: far, bpm: 88.0 };
    assert!(matches!(sample.validate(), Err(Error::InvalidSample(_))));

    let audio = AudioEvent {
      subject_id: id,
      timestamp:  far,
      kind:       Vocalization::Whine,
      confidence: 0.9,
    };
    assert!(audio.validate().is_err());

    assert!(NewContextEvent::new(id, far, ContextLabel::Car).validate().is_err());
    assert!(NewContextEvent::new(id, Utc::now(), ContextLabel::Car).validate().is_ok());
  }

  #[test]
  fn audio_confidence_validation() {
    let mut e = AudioEvent {
      subject_id: Uuid::new_v4(),
      timestamp:  Utc::now(),
      kind:       Vocalization::Bark,
      confidence: 1.0,
    };
    assert!(e.validate().is_ok());
    e.confidence = 1.2;
    assert!(e.validate().is_err());
  }
}
