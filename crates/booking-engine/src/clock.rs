//! Boundary date/time formats.
//!
//! Dates cross the engine boundary as `YYYY-MM-DD` and times as `HH:MM`.
//! Everything is in a single implicit local timezone with minute precision.

use chrono::{Duration, NaiveDate, NaiveTime};

use crate::error::{BookingError, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
        .map_err(|e| BookingError::InvalidInput(format!("date '{}': {}", input, e)))
}

/// Parse an `HH:MM` time.
pub fn parse_time(input: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(input.trim(), TIME_FORMAT)
        .map_err(|e| BookingError::InvalidInput(format!("time '{}': {}", input, e)))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// End of an interval of `minutes` starting at `start`.
///
/// Returns `None` when the interval would wrap past midnight.
pub fn end_of(start: NaiveTime, minutes: u32) -> Option<NaiveTime> {
    let (end, wrapped) = start.overflowing_add_signed(Duration::minutes(i64::from(minutes)));
    if wrapped != 0 {
        return None;
    }
    Some(end)
}

/// Whole minutes from `from` to `to` (negative if `to` is earlier).
pub fn minutes_between(from: NaiveTime, to: NaiveTime) -> i64 {
    (to - from).num_minutes()
}

/// Serde adapter for `HH:MM` times.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_time(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time(&raw).map_err(serde::de::Error::custom)
    }
}
