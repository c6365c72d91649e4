//! Persistence port for the scheduling core.
//!
//! The core only talks to storage through [`Store`]. Every method may block
//! on I/O. Implementations must make [`Store::commit_booking`] an atomic
//! check-and-insert: no two confirmed bookings for one provider-day may ever
//! overlap, even when commits race.

mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::NaiveDate;

use crate::error::Result;
use crate::types::{
    AgendaEntry, Booking, BookingId, Client, ClientBooking, ClientId, NewBooking, Provider,
    ProviderId, Service, ServiceId, WorkingHours,
};

/// Outcome of a client insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientInsert {
    Inserted(ClientId),
    /// The phone or external id already belongs to some client.
    Duplicate,
}

pub trait Store: Send + Sync {
    // Clients

    fn insert_client(&self, name: &str, phone: &str, external_id: Option<i64>)
        -> Result<ClientInsert>;

    fn get_client(&self, id: ClientId) -> Result<Option<Client>>;

    fn find_client_by_phone(&self, phone: &str) -> Result<Option<Client>>;

    fn find_client_by_external_id(&self, external_id: i64) -> Result<Option<Client>>;

    /// Set the client's external id if it has none. Returns whether the row
    /// changed; an id already held by another client leaves it unchanged.
    fn backfill_external_id(&self, id: ClientId, external_id: i64) -> Result<bool>;

    // Catalog

    /// Insert a service unless one with the same name exists; returns its id.
    fn seed_service(&self, name: &str, duration_minutes: u32, price: i64) -> Result<ServiceId>;

    /// Insert a provider unless one with the same name exists; returns its id.
    fn seed_provider(&self, name: &str, specialization: Option<&str>) -> Result<ProviderId>;

    fn list_services(&self) -> Result<Vec<Service>>;

    fn get_service(&self, id: ServiceId) -> Result<Option<Service>>;

    fn list_providers(&self) -> Result<Vec<Provider>>;

    fn get_provider(&self, id: ProviderId) -> Result<Option<Provider>>;

    // Schedule

    /// Store a working-hours entry. Fails with `DuplicateWorkingHours` if
    /// the provider already has one on that date.
    fn put_working_hours(&self, hours: &WorkingHours) -> Result<()>;

    fn working_hours(&self, provider: ProviderId, date: NaiveDate) -> Result<Option<WorkingHours>>;

    // Bookings

    /// Confirmed bookings for a provider-day, ordered by start.
    fn confirmed_bookings(&self, provider: ProviderId, date: NaiveDate) -> Result<Vec<Booking>>;

    /// Atomically re-validate and insert a confirmed booking.
    ///
    /// # Errors
    /// - `OutsideWorkingHours` if the interval is not inside the provider's
    ///   working hours for that date (or there are none).
    /// - `SlotConflict` if it overlaps a confirmed booking.
    /// - `Persistence` on any storage fault; nothing is written.
    fn commit_booking(&self, booking: &NewBooking) -> Result<BookingId>;

    /// Transition a booking from confirmed to cancelled.
    ///
    /// # Errors
    /// `BookingNotFound` if there is no such row, `BookingNotConfirmed` if it
    /// was already cancelled.
    fn cancel_booking(&self, id: BookingId) -> Result<()>;

    fn get_booking(&self, id: BookingId) -> Result<Option<Booking>>;

    /// Confirmed bookings of one client, ordered by date then start.
    fn client_bookings(&self, client: ClientId) -> Result<Vec<ClientBooking>>;

    /// Confirmed bookings with `from <= date <= to`, ordered by date then start.
    fn agenda(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<AgendaEntry>>;
}
