//! Core types and trait definitions for Pawsight.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! describes the three telemetry streams, the insight records derived from
//! them, and the [`store::EventStore`] abstraction every backend implements.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod insight;
pub mod signal;
pub mod store;
pub mod subject;

pub use error::{Error, Result};
