//! Choosing which insight, if any, is worth a push notification.

use std::future::Future;

use chrono::{DateTime, TimeDelta, Utc};
use pawsight_core::{
  insight::InsightRecord,
  store::{EventStore, InsightQuery},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyPolicy {
  /// Only insights at or above this score are pushed.
  pub min_score:     f64,
  /// Never look further back than this, even if nothing was ever pushed.
  pub max_age_hours: u32,
  pub limit:         usize,
  pub title:         String,
}

impl Default for NotifyPolicy {
  fn default() -> Self {
    Self {
      min_score:     0.75,
      max_age_hours: 25,
      limit:         3,
      title:         "High-priority dog insight".to_owned(),
    }
  }
}

impl NotifyPolicy {
  /// Lower bound on `computed_at` for candidates.
  pub fn since(&self, last_pushed_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = now
      .checked_sub_signed(TimeDelta::hours(i64::from(self.max_age_hours)))
      .unwrap_or(DateTime::<Utc>::MIN_UTC);
    last_pushed_at.map_or(floor, |last| last.max(floor))
  }
}

/// Delivery channel for notifications.
pub trait Notifier: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn send<'a>(
    &'a self,
    title: &'a str,
    body: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// The newest high-scoring insight computed since the last push.
pub async fn select_for_push<S: EventStore>(
  store: &S,
  policy: &NotifyPolicy,
  subject_id: Uuid,
  last_pushed_at: Option<DateTime<Utc>>,
  now: DateTime<Utc>,
) -> Result<Option<InsightRecord>> {
  let query = InsightQuery {
    subject_id: Some(subject_id),
    since:      Some(policy.since(last_pushed_at, now)),
    min_score:  Some(policy.min_score),
    limit:      Some(policy.limit),
  };
  let candidates = store.list_insights(&query).await.map_err(Error::from_store)?;
  Ok(candidates.into_iter().next())
}

/// Select and send. Returns the insight that was delivered, if any; the
/// caller records the push time.
pub async fn push_top<S: EventStore, N: Notifier>(
  store: &S,
  notifier: &N,
  policy: &NotifyPolicy,
  subject_id: Uuid,
  last_pushed_at: Option<DateTime<Utc>>,
  now: DateTime<Utc>,
) -> Result<Option<InsightRecord>> {
  let Some(top) = select_for_push(store, policy, subject_id, last_pushed_at, now).await? else {
    tracing::debug!(%subject_id, "nothing to push");
    return Ok(None);
  };
  notifier
    .send(&policy.title, &top.summary)
    .await
    .map_err(|e| Error::Notify(Box::new(e)))?;
  tracing::info!(%subject_id, category = %top.category, score = top.score, "insight pushed");
  Ok(Some(top))
}
