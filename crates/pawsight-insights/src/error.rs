//! Error type for `pawsight-insights`.
//!
//! An empty input is not an error: rules report it as
//! [`crate::SkipReason`] on a not-created outcome.

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// The backing store is not reachable at all.
  #[error("store unavailable: {0}")]
  StoreUnavailable(#[source] BoxError),

  /// The store answered, but a read or write failed.
  #[error("query failed: {0}")]
  QueryFailure(#[source] BoxError),

  /// A rule threshold is outside the range its rule can work with.
  #[error("invalid rule config: {0}")]
  InvalidConfig(String),

  #[error("notification delivery failed: {0}")]
  Notify(#[source] BoxError),

  #[error("rule task failed: {0}")]
  Task(#[from] tokio::task::JoinError),
}

impl Error {
  /// Classify a backend error by whether the store was reachable.
  pub fn from_store<E: pawsight_core::store::StoreError>(e: E) -> Self {
    if e.is_unavailable() {
      Self::StoreUnavailable(Box::new(e))
    } else {
      Self::QueryFailure(Box::new(e))
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
