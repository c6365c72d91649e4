//! Error types for booking-engine operations.

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

use crate::types::{BookingId, ClientId, ProviderId, ServiceId};

/// Coarse error category exposed to callers.
///
/// Front ends branch on this to choose a user-facing message; the engine
/// itself never formats human text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidInput,
    IdentityResolutionFailed,
    Persistence,
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Client not found: {0}")]
    ClientNotFound(ClientId),

    #[error("Service not found: {0}")]
    ServiceNotFound(ServiceId),

    #[error("Provider not found: {0}")]
    ProviderNotFound(ProviderId),

    #[error("Booking not found: {0}")]
    BookingNotFound(BookingId),

    /// Provider identifiers must be positive.
    #[error("Invalid provider id: {0}")]
    InvalidProvider(ProviderId),

    /// The requested interval intersects a confirmed booking.
    #[error(
        "Slot {start}-{end} on {date} overlaps booking {conflicting} by {overlap_minutes} min"
    )]
    SlotConflict {
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        conflicting: BookingId,
        overlap_minutes: i64,
    },

    /// Cancel was requested for a booking that is no longer confirmed.
    #[error("Booking {0} is not confirmed")]
    BookingNotConfirmed(BookingId),

    #[error("Working hours already defined for provider {provider} on {date}")]
    DuplicateWorkingHours {
        provider: ProviderId,
        date: NaiveDate,
    },

    #[error("Interval starting {start} on {date} is outside working hours")]
    OutsideWorkingHours { date: NaiveDate, start: NaiveTime },

    #[error("Ambiguous {what} '{input}': {candidates:?}")]
    AmbiguousMatch {
        what: &'static str,
        input: String,
        candidates: Vec<String>,
    },

    #[error("No {what} matches '{input}'")]
    NoMatch { what: &'static str, input: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An identifier collided on insert, yet neither identifier finds a row.
    #[error("Client identity could not be resolved for phone {phone}")]
    IdentityResolutionFailed { phone: String },

    #[error("Storage error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ClientNotFound(_)
            | Self::ServiceNotFound(_)
            | Self::ProviderNotFound(_)
            | Self::BookingNotFound(_)
            | Self::NoMatch { .. } => ErrorKind::NotFound,
            Self::SlotConflict { .. }
            | Self::BookingNotConfirmed(_)
            | Self::DuplicateWorkingHours { .. } => ErrorKind::Conflict,
            Self::InvalidProvider(_)
            | Self::OutsideWorkingHours { .. }
            | Self::AmbiguousMatch { .. }
            | Self::InvalidInput(_)
            | Self::Config(_) => ErrorKind::InvalidInput,
            Self::IdentityResolutionFailed { .. } => ErrorKind::IdentityResolutionFailed,
            Self::Persistence(_) => ErrorKind::Persistence,
        }
    }
}

pub type Result<T> = std::result::Result<T, BookingError>;
