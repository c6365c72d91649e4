//! Booking ledger: validated commits and cancellations.
//!
//! `create_booking` checks its inputs in a fixed order and stops at the
//! first failure; nothing is written unless every check passes. The final
//! overlap check is always repeated inside the store's commit transaction,
//! even if the caller listed slots a moment earlier, because another caller
//! may have taken the slot in between.

use chrono::{NaiveDate, NaiveTime};
use tracing::{info, warn};

use crate::clock;
use crate::error::{BookingError, Result};
use crate::store::Store;
use crate::types::{
    AgendaEntry, Booking, BookingId, ClientBooking, ClientId, NewBooking, ProviderId, ServiceId,
};

/// Validate and commit a confirmed booking.
///
/// Checks, in order:
/// 1. the client exists (`ClientNotFound`)
/// 2. the service exists (`ServiceNotFound`)
/// 3. the provider id is positive (`InvalidProvider`)
/// 4. `end = start + service duration` stays on the same day
///    (`OutsideWorkingHours`)
/// 5. atomically: the interval lies inside the provider's working hours and
///    overlaps no confirmed booking (`OutsideWorkingHours`, `SlotConflict`)
pub fn create_booking<S: Store + ?Sized>(
    store: &S,
    client_id: ClientId,
    service_id: ServiceId,
    provider_id: ProviderId,
    date: NaiveDate,
    start: NaiveTime,
) -> Result<BookingId> {
    if !client_id.is_valid() || store.get_client(client_id)?.is_none() {
        return Err(BookingError::ClientNotFound(client_id));
    }

    let service = if service_id.is_valid() {
        store.get_service(service_id)?
    } else {
        None
    };
    let service = service.ok_or(BookingError::ServiceNotFound(service_id))?;

    if !provider_id.is_valid() {
        return Err(BookingError::InvalidProvider(provider_id));
    }

    let end = clock::end_of(start, service.duration_minutes)
        .ok_or(BookingError::OutsideWorkingHours { date, start })?;

    let booking = NewBooking {
        client_id,
        service_id,
        provider_id,
        date,
        start,
        end,
    };

    match store.commit_booking(&booking) {
        Ok(id) => {
            info!(
                booking = %id,
                client = %client_id,
                service = %service_id,
                provider = %provider_id,
                %date,
                start = %clock::format_time(start),
                end = %clock::format_time(end),
                "booking confirmed"
            );
            Ok(id)
        }
        Err(e) => {
            warn!(
                provider = %provider_id,
                %date,
                start = %clock::format_time(start),
                error = %e,
                "booking rejected"
            );
            Err(e)
        }
    }
}

/// Cancel a confirmed booking. The row is kept with status `cancelled`.
///
/// # Errors
/// `BookingNotFound` for an unknown id, `BookingNotConfirmed` if the
/// booking was already cancelled.
pub fn cancel_booking<S: Store + ?Sized>(store: &S, id: BookingId) -> Result<()> {
    if !id.is_valid() {
        return Err(BookingError::BookingNotFound(id));
    }
    store.cancel_booking(id)?;
    info!(booking = %id, "booking cancelled");
    Ok(())
}

pub fn get_booking<S: Store + ?Sized>(store: &S, id: BookingId) -> Result<Booking> {
    store
        .get_booking(id)?
        .ok_or(BookingError::BookingNotFound(id))
}

/// Confirmed bookings of a client, ordered by date then start.
pub fn list_client_bookings<S: Store + ?Sized>(
    store: &S,
    client: ClientId,
) -> Result<Vec<ClientBooking>> {
    store.client_bookings(client)
}

/// Confirmed bookings across all providers for an inclusive date range.
pub fn agenda<S: Store + ?Sized>(
    store: &S,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<AgendaEntry>> {
    if from > to {
        return Err(BookingError::InvalidInput(format!(
            "agenda range {} .. {} is inverted",
            from, to
        )));
    }
    store.agenda(from, to)
}
