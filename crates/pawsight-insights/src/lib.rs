//! The Pawsight insight engine.
//!
//! Correlates user-logged context events with heart-rate and vocalization
//! windows around them. Seven independent rules each decide whether a
//! pattern is significant and, if so, upsert one scored record for their
//! category. The [`orchestrator`] runs all seven for a subject.
//!
//! Everything here works against an explicit [`pawsight_core::store::EventStore`]
//! handle; there is no global client.

pub mod config;
pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod rules;
pub mod summary;
pub mod window;

pub use config::RuleConfig;
pub use error::{Error, Result};
pub use notify::{Notifier, NotifyPolicy};
pub use orchestrator::{CycleReport, CycleStatus, run_cycle, run_cycle_concurrent};
pub use rules::{AnalysisScope, RuleOutcome, SkipReason};

#[cfg(test)]
mod testing;
