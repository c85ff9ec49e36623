//! Background insight cycle: recompute every subject, then push the most
//! urgent new insight.

use std::{convert::Infallible, time::Duration};

use chrono::{DateTime, Utc};
use pawsight_core::store::EventStore as _;
use pawsight_insights::{AnalysisScope, Notifier, NotifyPolicy, RuleConfig, notify, run_cycle};
use pawsight_store_sqlite::SqliteStore;
use uuid::Uuid;

/// Delivers notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
  type Error = Infallible;

  async fn send(&self, title: &str, body: &str) -> Result<(), Infallible> {
    tracing::info!(%title, %body, "notification");
    Ok(())
  }
}

/// Run one refresh for every subject. Failures are logged per subject and
/// never stop the others.
pub async fn refresh_all<N: Notifier>(
  store: &SqliteStore,
  rules: &RuleConfig,
  policy: &NotifyPolicy,
  notifier: &N,
  now: DateTime<Utc>,
) {
  let subjects = match store.list_subjects().await {
    Ok(subjects) => subjects,
    Err(e) => {
      tracing::warn!(error = %e, "could not list subjects; skipping refresh");
      return;
    }
  };

  for subject in subjects {
    refresh_subject(store, rules, policy, notifier, subject.subject_id, now).await;
  }
}

pub async fn refresh_subject<N: Notifier>(
  store: &SqliteStore,
  rules: &RuleConfig,
  policy: &NotifyPolicy,
  notifier: &N,
  subject_id: Uuid,
  now: DateTime<Utc>,
) {
  let report = run_cycle(store, rules, AnalysisScope::new(subject_id, now)).await;
  for (category, error) in report.failures() {
    tracing::warn!(%subject_id, %category, %error, "rule failed");
  }

  let last_pushed_at = match store.last_pushed_at(subject_id).await {
    Ok(last) => last,
    Err(e) => {
      tracing::warn!(%subject_id, error = %e, "could not read push state");
      return;
    }
  };

  match notify::push_top(store, notifier, policy, subject_id, last_pushed_at, now).await {
    Ok(Some(_)) => {
      if let Err(e) = store.set_last_pushed_at(subject_id, now).await {
        tracing::warn!(%subject_id, error = %e, "could not record push time");
      }
    }
    Ok(None) => {}
    Err(e) => tracing::warn!(%subject_id, error = %e, "notification failed"),
  }
}

/// Refresh on a fixed interval until the task is dropped.
pub async fn run(
  store: SqliteStore,
  rules: RuleConfig,
  policy: NotifyPolicy,
  every: Duration,
) {
  let mut ticker = tokio::time::interval(every);
  ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
  loop {
    ticker.tick().await;
    tracing::info!("starting insight refresh");
    refresh_all(&store, &rules, &policy, &TracingNotifier, Utc::now()).await;
  }
}
