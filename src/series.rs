//! Tide event types and the series normalizer.
//!
//! The tide API returns two disjoint arrays: predicted extremes and
//! instantaneous height samples. `normalize` folds both into one series of
//! typed events sorted ascending by time, which is what every consumer
//! works with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{RawExtreme, RawHeight};

/// Kind of a tide event within a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TideKind {
    High,
    Low,
    /// The instantaneous level at the head of the heights array.
    Current,
}

/// A single predicted or observed tide level.
///
/// Identity within a series is `time`; the provider guarantees per-series
/// timestamp uniqueness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TideEvent {
    pub time: DateTime<Utc>,
    /// Height in meters relative to the requested datum.
    pub height: f64,
    pub kind: TideKind,
}

/// Merge decoded extremes and height samples into one sorted series.
///
/// Extremes map to `High`/`Low` by their label; only the first height sample
/// (the "now"-relative one) becomes a `Current` event. An empty heights array
/// simply produces no `Current` event, and fully empty inputs produce an
/// empty series — the caller decides whether that is a "no data" condition.
///
/// The sort is stable, so an extreme and the current sample sharing a
/// timestamp keep their insertion order (extreme first).
pub fn normalize(extremes: &[RawExtreme], heights: &[RawHeight]) -> Vec<TideEvent> {
    let mut events: Vec<TideEvent> = extremes
        .iter()
        .map(|extreme| TideEvent {
            time: DateTime::from_timestamp(extreme.dt, 0).unwrap_or_default(),
            height: extreme.height,
            kind: if extreme.kind == "High" {
                TideKind::High
            } else {
                TideKind::Low
            },
        })
        .collect();

    if let Some(current) = heights.first() {
        events.push(TideEvent {
            time: DateTime::from_timestamp(current.dt, 0).unwrap_or_default(),
            height: current.height,
            kind: TideKind::Current,
        });
    }

    events.sort_by_key(|event| event.time);
    events
}
