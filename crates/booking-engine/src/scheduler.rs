//! The scheduling core instance.
//!
//! A [`Scheduler`] owns its storage handle and configuration and is built
//! explicitly by whoever hosts it (the CLI, a chat front end, an admin
//! panel). It holds no per-request state, so one instance can be wrapped in
//! an `Arc` and shared by every concurrent handler.

use chrono::{NaiveDate, NaiveTime};

use crate::availability::{self, FreeWindow, Slot};
use crate::catalog::{self, Named};
use crate::config::EngineConfig;
use crate::error::{BookingError, Result};
use crate::identity;
use crate::ledger;
use crate::overlap::Interval;
use crate::seed::{self, SeedReport};
use crate::store::{SqliteStore, Store};
use crate::types::{
    AgendaEntry, Booking, BookingId, Client, ClientBooking, ClientId, Provider, ProviderId,
    Service, ServiceId, WorkingHours,
};

pub struct Scheduler<S = SqliteStore> {
    store: S,
    config: EngineConfig,
}

impl Scheduler<SqliteStore> {
    /// Open the database named by `config.database_path`.
    pub fn open(config: EngineConfig) -> Result<Self> {
        let store = SqliteStore::open(&config.database_path, config.busy_timeout())?;
        Ok(Self::new(store, config))
    }

    /// A scheduler over a fresh in-memory database.
    pub fn in_memory(config: EngineConfig) -> Result<Self> {
        Ok(Self::new(SqliteStore::open_in_memory()?, config))
    }
}

impl<S: Store> Scheduler<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Identity ────────────────────────────────────────────────────────

    /// See [`identity::resolve_or_create`].
    pub fn resolve_or_create(
        &self,
        name: &str,
        phone: &str,
        external_id: Option<i64>,
    ) -> Result<ClientId> {
        identity::resolve_or_create(&self.store, name, phone, external_id)
    }

    pub fn find_client(
        &self,
        phone: Option<&str>,
        external_id: Option<i64>,
    ) -> Result<Option<ClientId>> {
        identity::find_client(&self.store, phone, external_id)
    }

    pub fn get_client(&self, id: ClientId) -> Result<Client> {
        self.store
            .get_client(id)?
            .ok_or(BookingError::ClientNotFound(id))
    }

    // ── Catalog ─────────────────────────────────────────────────────────

    pub fn list_services(&self) -> Result<Vec<Service>> {
        self.store.list_services()
    }

    pub fn list_providers(&self) -> Result<Vec<Provider>> {
        self.store.list_providers()
    }

    pub fn get_service(&self, id: ServiceId) -> Result<Option<Service>> {
        self.store.get_service(id)
    }

    pub fn get_provider(&self, id: ProviderId) -> Result<Option<Provider>> {
        self.store.get_provider(id)
    }

    /// Providers able to perform a service. Every provider performs every
    /// service; the service must exist.
    pub fn providers_for_service(&self, service: ServiceId) -> Result<Vec<Provider>> {
        if self.store.get_service(service)?.is_none() {
            return Err(BookingError::ServiceNotFound(service));
        }
        self.store.list_providers()
    }

    /// Resolve a human-entered service name with the configured rule.
    pub fn find_service(&self, input: &str) -> Result<Service> {
        self.find_named(&self.store.list_services()?, input)
    }

    /// Resolve a human-entered provider name with the configured rule.
    pub fn find_provider(&self, input: &str) -> Result<Provider> {
        self.find_named(&self.store.list_providers()?, input)
    }

    fn find_named<T: Named + Clone>(&self, entries: &[T], input: &str) -> Result<T> {
        catalog::match_name(entries, input, self.config.match_rule).cloned()
    }

    // ── Schedule ────────────────────────────────────────────────────────

    /// Define a provider's working hours for one date.
    ///
    /// # Errors
    /// `InvalidInput` unless `start < end`, `ProviderNotFound` for an unknown
    /// provider, `DuplicateWorkingHours` if the date already has an entry.
    pub fn set_working_hours(
        &self,
        provider: ProviderId,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<()> {
        if start >= end {
            return Err(BookingError::InvalidInput(format!(
                "working hours {} - {} are empty",
                start, end
            )));
        }
        if self.store.get_provider(provider)?.is_none() {
            return Err(BookingError::ProviderNotFound(provider));
        }
        self.store.put_working_hours(&WorkingHours {
            provider_id: provider,
            date,
            start,
            end,
        })
    }

    pub fn working_hours(
        &self,
        provider: ProviderId,
        date: NaiveDate,
    ) -> Result<Option<WorkingHours>> {
        self.store.working_hours(provider, date)
    }

    // ── Availability ────────────────────────────────────────────────────

    /// Bookable `[start, end)` slots for a service duration, in start order.
    ///
    /// A provider that does not work that day (or does not exist) simply
    /// has no slots.
    ///
    /// # Errors
    /// `InvalidInput` for a zero duration; storage faults.
    pub fn available_slots(
        &self,
        provider: ProviderId,
        date: NaiveDate,
        duration_minutes: u32,
    ) -> Result<Vec<Slot>> {
        if duration_minutes == 0 {
            return Err(BookingError::InvalidInput(
                "service duration must be positive".to_string(),
            ));
        }
        let Some(hours) = self.store.working_hours(provider, date)? else {
            return Ok(Vec::new());
        };
        let booked = self.booked_intervals(provider, date)?;
        Ok(availability::compute_slots(
            &hours,
            &booked,
            duration_minutes,
            self.config.slot_step_minutes,
        ))
    }

    /// Gaps between confirmed bookings inside the provider's hours.
    pub fn free_windows(&self, provider: ProviderId, date: NaiveDate) -> Result<Vec<FreeWindow>> {
        let Some(hours) = self.store.working_hours(provider, date)? else {
            return Ok(Vec::new());
        };
        let booked = self.booked_intervals(provider, date)?;
        Ok(availability::free_windows(&hours, &booked))
    }

    fn booked_intervals(&self, provider: ProviderId, date: NaiveDate) -> Result<Vec<Interval>> {
        Ok(self
            .store
            .confirmed_bookings(provider, date)?
            .iter()
            .map(|b| Interval::new(b.start, b.end))
            .collect())
    }

    // ── Ledger ──────────────────────────────────────────────────────────

    /// See [`ledger::create_booking`].
    pub fn create_booking(
        &self,
        client: ClientId,
        service: ServiceId,
        provider: ProviderId,
        date: NaiveDate,
        start: NaiveTime,
    ) -> Result<BookingId> {
        ledger::create_booking(&self.store, client, service, provider, date, start)
    }

    pub fn cancel_booking(&self, id: BookingId) -> Result<()> {
        ledger::cancel_booking(&self.store, id)
    }

    pub fn get_booking(&self, id: BookingId) -> Result<Booking> {
        ledger::get_booking(&self.store, id)
    }

    pub fn list_client_bookings(&self, client: ClientId) -> Result<Vec<ClientBooking>> {
        ledger::list_client_bookings(&self.store, client)
    }

    pub fn agenda(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<AgendaEntry>> {
        ledger::agenda(&self.store, from, to)
    }

    // ── Seeding ─────────────────────────────────────────────────────────

    /// Seed the configured catalog and schedule starting at `today`.
    pub fn seed(&self, today: NaiveDate) -> Result<SeedReport> {
        seed::seed(&self.store, &self.config.seed, today)
    }
}
