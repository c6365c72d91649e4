//! Bookable start times for one provider on one date.
//!
//! Candidates are enumerated on a fixed grid starting at the working-hours
//! start. A candidate `[t, t + duration)` is offered iff it ends no later
//! than the working-hours end and overlaps no confirmed booking. The grid
//! holds at most a few dozen points per provider-day, so every candidate is
//! checked against every booking.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock;
use crate::overlap::{self, Interval};
use crate::types::WorkingHours;

/// Default grid step between candidate start times.
pub const DEFAULT_STEP_MINUTES: u32 = 15;

/// A proposed `[start, end)` appointment interval.
pub type Slot = Interval;

/// A gap between bookings inside working hours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeWindow {
    #[serde(flatten)]
    pub interval: Interval,
    pub duration_minutes: i64,
}

/// Enumerate valid slots of `duration_minutes` on a `step_minutes` grid.
///
/// Slots are returned in ascending start order; overlapping proposals are
/// all kept (each is an independent option). A zero step yields nothing.
pub fn compute_slots(
    hours: &WorkingHours,
    booked: &[Interval],
    duration_minutes: u32,
    step_minutes: u32,
) -> Vec<Slot> {
    let mut slots = Vec::new();
    if step_minutes == 0 || hours.start >= hours.end {
        return slots;
    }

    let window = Interval::new(hours.start, hours.end);
    let mut candidate_start = hours.start;

    loop {
        // Past midnight means past the end of any same-day window.
        let Some(candidate_end) = clock::end_of(candidate_start, duration_minutes) else {
            break;
        };
        if candidate_end > window.end {
            break;
        }

        let candidate = Interval::new(candidate_start, candidate_end);
        if overlap::is_free(&candidate, booked) {
            slots.push(candidate);
        }

        match clock::end_of(candidate_start, step_minutes) {
            Some(next) if next > candidate_start => candidate_start = next,
            _ => break,
        }
    }

    debug!(
        provider = %hours.provider_id,
        date = %hours.date,
        duration_minutes,
        booked = booked.len(),
        slots = slots.len(),
        "computed slots"
    );
    slots
}

/// Free gaps inside working hours after merging the booked intervals.
pub fn free_windows(hours: &WorkingHours, booked: &[Interval]) -> Vec<FreeWindow> {
    let window = Interval::new(hours.start, hours.end);
    let clipped: Vec<Interval> = booked
        .iter()
        .filter(|b| b.overlaps(&window))
        .map(|b| Interval::new(b.start.max(window.start), b.end.min(window.end)))
        .collect();

    let mut windows = Vec::new();
    let mut cursor = window.start;

    for busy in overlap::merge(&clipped) {
        if cursor < busy.start {
            windows.push(free_window(cursor, busy.start));
        }
        cursor = cursor.max(busy.end);
    }

    if cursor < window.end {
        windows.push(free_window(cursor, window.end));
    }

    windows
}

fn free_window(start: chrono::NaiveTime, end: chrono::NaiveTime) -> FreeWindow {
    let interval = Interval::new(start, end);
    FreeWindow {
        duration_minutes: interval.duration_minutes(),
        interval,
    }
}
