//! Subject: the tracked dog that telemetry and insights are keyed by.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A monitored dog. Samples, context events and insights all reference a
/// subject by its stable UUID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
  pub subject_id: Uuid,
  pub name:       String,
  pub breed:      Option<String>,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::EventStore::add_subject`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubject {
  pub name:  String,
  #[serde(default)]
  pub breed: Option<String>,
}
