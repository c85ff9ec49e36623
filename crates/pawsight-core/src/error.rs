//! Error types for `pawsight-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid sample: {0}")]
  InvalidSample(String),

  #[error("unknown context label: {0:?}")]
  UnknownLabel(String),

  #[error("unknown insight category: {0:?}")]
  UnknownCategory(String),

  #[error("unknown vocalization kind: {0:?}")]
  UnknownVocalization(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
