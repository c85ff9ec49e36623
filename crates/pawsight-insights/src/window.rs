//! Window correlation over time-stamped streams.
//!
//! A [`Series`] holds one stream sorted ascending by timestamp. Given a
//! reference instant `t`, [`Series::around`] splits out the half-open
//! windows `[t - back, t)` and `[t, t + ahead)` as borrowed slices. A sample
//! stamped exactly `t` belongs to the post window only.
//!
//! Statistics over an empty window are `None`, never zero: callers skip that
//! reference point.

use chrono::{DateTime, TimeDelta, Utc};
use pawsight_core::signal::{AudioEvent, ContextEvent, HeartRateSample};

// ─── Timestamped ─────────────────────────────────────────────────────────────

/// Anything with a position on the timeline.
pub trait Timestamped {
  fn timestamp(&self) -> DateTime<Utc>;
}

impl Timestamped for HeartRateSample {
  fn timestamp(&self) -> DateTime<Utc> { self.timestamp }
}

impl Timestamped for AudioEvent {
  fn timestamp(&self) -> DateTime<Utc> { self.timestamp }
}

impl Timestamped for ContextEvent {
  fn timestamp(&self) -> DateTime<Utc> { self.timestamp }
}

// ─── Window ──────────────────────────────────────────────────────────────────

/// Extent of the pre and post windows around a reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
  pub back:  TimeDelta,
  pub ahead: TimeDelta,
}

impl Window {
  pub fn symmetric(span: TimeDelta) -> Self { Self { back: span, ahead: span } }

  /// A window with no pre part.
  pub fn post_only(ahead: TimeDelta) -> Self { Self { back: TimeDelta::zero(), ahead } }
}

/// The two halves of a window split.
#[derive(Debug)]
pub struct Split<'a, T> {
  pub pre:  &'a [T],
  pub post: &'a [T],
}

// ─── Series ──────────────────────────────────────────────────────────────────

/// A stream sorted ascending by timestamp.
#[derive(Debug, Clone)]
pub struct Series<T> {
  records: Vec<T>,
}

impl<T: Timestamped> Series<T> {
  /// Wrap `records`, sorting them. The sort is stable, so duplicates keep
  /// their arrival order.
  pub fn new(mut records: Vec<T>) -> Self {
    records.sort_by_key(|r| r.timestamp());
    Self { records }
  }

  pub fn is_empty(&self) -> bool { self.records.is_empty() }

  pub fn len(&self) -> usize { self.records.len() }

  pub fn iter(&self) -> std::slice::Iter<'_, T> { self.records.iter() }

  pub fn as_slice(&self) -> &[T] { &self.records }

  /// Records with `from <= timestamp < to`.
  pub fn between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> &[T] {
    let lo = self.records.partition_point(|r| r.timestamp() < from);
    let hi = self.records.partition_point(|r| r.timestamp() < to);
    if hi <= lo { &[] } else { &self.records[lo..hi] }
  }

  /// Split the records around `at` according to `window`.
  pub fn around(&self, at: DateTime<Utc>, window: Window) -> Split<'_, T> {
    let start = at
      .checked_sub_signed(window.back)
      .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let end = at
      .checked_add_signed(window.ahead)
      .unwrap_or(DateTime::<Utc>::MAX_UTC);
    Split { pre: self.between(start, at), post: self.between(at, end) }
  }
}

// ─── Statistics ──────────────────────────────────────────────────────────────

/// Count, mean and population variance of a non-empty window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
  pub count:    usize,
  pub mean:     f64,
  pub variance: f64,
}

impl WindowStats {
  /// `None` when `values` is empty.
  pub fn of(values: impl IntoIterator<Item = f64>) -> Option<Self> {
    let values: Vec<f64> = values.into_iter().collect();
    let mean = mean(&values)?;
    let variance =
      values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(Self { count: values.len(), mean, variance })
  }
}

/// Heart-rate statistics for a window of samples.
pub fn bpm_stats(samples: &[HeartRateSample]) -> Option<WindowStats> {
  WindowStats::of(samples.iter().map(|s| s.bpm))
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
  if values.is_empty() {
    None
  } else {
    Some(values.iter().sum::<f64>() / values.len() as f64)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;
  use uuid::Uuid;

  use super::*;

  fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() }

  fn hr(offset_min: i64, bpm: f64) -> HeartRateSample {
    HeartRateSample {
      subject_id: Uuid::nil(),
      timestamp:  t0() + TimeDelta::minutes(offset_min),
      bpm,
    }
  }

  #[test]
  fn half_open_boundaries() {
    let series = Series::new(vec![
      hr(-16, 1.0), // before the pre window
      hr(-15, 2.0), // exactly t - back: in pre
      hr(-1, 3.0),
      hr(0, 4.0),   // exactly t: in post only
      hr(14, 5.0),
      hr(15, 6.0),  // exactly t + ahead: excluded
    ]);
    let split = series.around(t0(), Window::symmetric(TimeDelta::minutes(15)));
    let pre: Vec<f64> = split.pre.iter().map(|s| s.bpm).collect();
    let post: Vec<f64> = split.post.iter().map(|s| s.bpm).collect();
    assert_eq!(pre, [2.0, 3.0]);
    assert_eq!(post, [4.0, 5.0]);
  }

  #[test]
  fn unsorted_input_is_sorted_once() {
    let series = Series::new(vec![hr(5, 3.0), hr(-5, 1.0), hr(1, 2.0)]);
    let bpms: Vec<f64> = series.iter().map(|s| s.bpm).collect();
    assert_eq!(bpms, [1.0, 2.0, 3.0]);
  }

  #[test]
  fn post_only_window_has_empty_pre() {
    let series = Series::new(vec![hr(-1, 1.0), hr(1, 2.0)]);
    let split = series.around(t0(), Window::post_only(TimeDelta::minutes(20)));
    assert!(split.pre.is_empty());
    assert_eq!(split.post.len(), 1);
  }

  #[test]
  fn empty_window_has_no_stats() {
    assert_eq!(bpm_stats(&[]), None);
    assert_eq!(mean(&[]), None);
  }

  #[test]
  fn population_variance() {
    let stats = WindowStats::of([70.0, 71.0, 69.0, 70.0]).unwrap();
    assert_eq!(stats.count, 4);
    assert!((stats.mean - 70.0).abs() < 1e-9);
    assert!((stats.variance - 0.5).abs() < 1e-9);
  }

  #[test]
  fn single_sample_has_zero_variance() {
    let stats = bpm_stats(&[hr(0, 90.0)]).unwrap();
    assert_eq!(stats.variance, 0.0);
  }
}
