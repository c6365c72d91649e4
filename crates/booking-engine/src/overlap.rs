//! Half-open time intervals and overlap detection.
//!
//! Two intervals `[a, b)` and `[c, d)` overlap iff `a < d && c < b`.
//! Intervals that merely touch (one ends exactly when the other starts) do
//! NOT overlap.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::clock::{self, hhmm};

/// A `[start, end)` interval within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Interval {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl Interval {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether `self` lies entirely inside `outer`.
    pub fn within(&self, outer: &Interval) -> bool {
        self.start >= outer.start && self.end <= outer.end
    }

    pub fn duration_minutes(&self) -> i64 {
        clock::minutes_between(self.start, self.end)
    }
}

/// A booked interval that intersects a candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict<T> {
    pub booked: T,
    pub overlap_minutes: i64,
}

/// Find every booked interval that overlaps `candidate`.
///
/// `booked` may carry any payload (a booking id, a full row); `interval_of`
/// projects it onto its time range. Results keep the input order.
pub fn find_conflicts<T: Clone>(
    candidate: &Interval,
    booked: &[T],
    interval_of: impl Fn(&T) -> Interval,
) -> Vec<Conflict<T>> {
    let mut conflicts = Vec::new();

    for item in booked {
        let other = interval_of(item);
        if candidate.overlaps(&other) {
            let overlap_start = candidate.start.max(other.start);
            let overlap_end = candidate.end.min(other.end);

            conflicts.push(Conflict {
                booked: item.clone(),
                overlap_minutes: clock::minutes_between(overlap_start, overlap_end),
            });
        }
    }

    conflicts
}

/// Whether `candidate` overlaps none of `booked`.
pub fn is_free(candidate: &Interval, booked: &[Interval]) -> bool {
    booked.iter().all(|b| !candidate.overlaps(b))
}

/// Merge overlapping or touching intervals into a sorted, disjoint list.
pub fn merge(intervals: &[Interval]) -> Vec<Interval> {
    let mut sorted = intervals.to_vec();
    sorted.sort();

    let mut merged: Vec<Interval> = Vec::new();
    for interval in sorted {
        if let Some(last) = merged.last_mut() {
            if interval.start <= last.end {
                last.end = last.end.max(interval.end);
                continue;
            }
        }
        merged.push(interval);
    }

    merged
}
