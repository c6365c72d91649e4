//! Tests for client identity resolution across phone and external id.

use booking_engine::error::Result;
use booking_engine::store::ClientInsert;
use booking_engine::types::NewBooking;
use booking_engine::{
    AgendaEntry, Booking, BookingError, BookingId, Client, ClientBooking, ClientId, EngineConfig,
    ErrorKind, Provider, ProviderId, Scheduler, Service, ServiceId, SqliteStore, Store,
    WorkingHours,
};
use chrono::NaiveDate;

fn scheduler() -> Scheduler {
    Scheduler::in_memory(EngineConfig::default()).unwrap()
}

#[test]
fn first_resolution_creates_a_client() {
    let s = scheduler();
    let id = s.resolve_or_create("Olga", "8 (999) 123-45-67", None).unwrap();

    let client = s.get_client(id).unwrap();
    assert_eq!(client.name, "Olga");
    assert_eq!(client.phone, "+79991234567");
    assert_eq!(client.external_id, None);
}

#[test]
fn phone_spellings_converge_on_one_client() {
    let s = scheduler();
    let a = s.resolve_or_create("Olga", "89991234567", None).unwrap();
    let b = s.resolve_or_create("olga ", "+7 999 123 45 67", None).unwrap();
    let c = s.resolve_or_create("  OLGA", "79991234567", None).unwrap();

    assert_eq!(a, b);
    assert_eq!(b, c);
}

#[test]
fn external_id_is_backfilled_once() {
    let s = scheduler();
    let by_phone = s.resolve_or_create("Olga", "89991234567", None).unwrap();

    let via_chat = s
        .resolve_or_create("Olga", "+79991234567", Some(4242))
        .unwrap();
    assert_eq!(via_chat, by_phone);
    assert_eq!(s.get_client(by_phone).unwrap().external_id, Some(4242));

    // A different account id later does not overwrite the first.
    let again = s
        .resolve_or_create("Olga", "+79991234567", Some(5555))
        .unwrap();
    assert_eq!(again, by_phone);
    assert_eq!(s.get_client(by_phone).unwrap().external_id, Some(4242));
}

#[test]
fn external_id_wins_after_phone_change() {
    let s = scheduler();
    let original = s
        .resolve_or_create("Olga", "89991234567", Some(4242))
        .unwrap();

    let new_phone = s
        .resolve_or_create("Olga", "89990000000", Some(4242))
        .unwrap();
    assert_eq!(new_phone, original);
    // The stored phone is not rewritten.
    assert_eq!(s.get_client(original).unwrap().phone, "+79991234567");
}

#[test]
fn distinct_people_get_distinct_rows() {
    let s = scheduler();
    let a = s.resolve_or_create("A", "+15550100", Some(1)).unwrap();
    let b = s.resolve_or_create("B", "+15550101", Some(2)).unwrap();
    assert_ne!(a, b);
}

#[test]
fn find_client_does_not_create() {
    let s = scheduler();
    assert_eq!(s.find_client(Some("89991234567"), None).unwrap(), None);

    let id = s.resolve_or_create("Olga", "89991234567", Some(7)).unwrap();
    assert_eq!(s.find_client(None, Some(7)).unwrap(), Some(id));
    assert_eq!(s.find_client(Some("+7 999 123-45-67"), None).unwrap(), Some(id));
    assert_eq!(s.find_client(Some("+15550100"), Some(8)).unwrap(), None);
}

#[test]
fn invalid_inputs_are_rejected_before_storage() {
    let s = scheduler();
    let err = s.resolve_or_create("Olga", "no digits", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = s.resolve_or_create("   ", "89991234567", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(s.store().find_client_by_phone("+79991234567").unwrap().is_none());
}

/// A store whose inserts always collide but whose lookups never find
/// anything, as if the row vanished between the two.
struct VanishingStore(SqliteStore);

impl Store for VanishingStore {
    fn insert_client(&self, _: &str, _: &str, _: Option<i64>) -> Result<ClientInsert> {
        Ok(ClientInsert::Duplicate)
    }
    fn get_client(&self, id: ClientId) -> Result<Option<Client>> {
        self.0.get_client(id)
    }
    fn find_client_by_phone(&self, _: &str) -> Result<Option<Client>> {
        Ok(None)
    }
    fn find_client_by_external_id(&self, _: i64) -> Result<Option<Client>> {
        Ok(None)
    }
    fn backfill_external_id(&self, id: ClientId, external_id: i64) -> Result<bool> {
        self.0.backfill_external_id(id, external_id)
    }
    fn seed_service(&self, name: &str, duration: u32, price: i64) -> Result<ServiceId> {
        self.0.seed_service(name, duration, price)
    }
    fn seed_provider(&self, name: &str, specialization: Option<&str>) -> Result<ProviderId> {
        self.0.seed_provider(name, specialization)
    }
    fn list_services(&self) -> Result<Vec<Service>> {
        self.0.list_services()
    }
    fn get_service(&self, id: ServiceId) -> Result<Option<Service>> {
        self.0.get_service(id)
    }
    fn list_providers(&self) -> Result<Vec<Provider>> {
        self.0.list_providers()
    }
    fn get_provider(&self, id: ProviderId) -> Result<Option<Provider>> {
        self.0.get_provider(id)
    }
    fn put_working_hours(&self, hours: &WorkingHours) -> Result<()> {
        self.0.put_working_hours(hours)
    }
    fn working_hours(&self, provider: ProviderId, date: NaiveDate) -> Result<Option<WorkingHours>> {
        self.0.working_hours(provider, date)
    }
    fn confirmed_bookings(&self, provider: ProviderId, date: NaiveDate) -> Result<Vec<Booking>> {
        self.0.confirmed_bookings(provider, date)
    }
    fn commit_booking(&self, booking: &NewBooking) -> Result<BookingId> {
        self.0.commit_booking(booking)
    }
    fn cancel_booking(&self, id: BookingId) -> Result<()> {
        self.0.cancel_booking(id)
    }
    fn get_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        self.0.get_booking(id)
    }
    fn client_bookings(&self, client: ClientId) -> Result<Vec<ClientBooking>> {
        self.0.client_bookings(client)
    }
    fn agenda(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<AgendaEntry>> {
        self.0.agenda(from, to)
    }
}

#[test]
fn collision_without_a_row_is_a_resolution_failure() {
    let store = VanishingStore(SqliteStore::open_in_memory().unwrap());
    let s = Scheduler::new(store, EngineConfig::default());

    let err = s
        .resolve_or_create("Olga", "89991234567", Some(1))
        .unwrap_err();
    assert!(matches!(
        err,
        BookingError::IdentityResolutionFailed { ref phone } if phone == "+79991234567"
    ));
    assert_eq!(err.kind(), ErrorKind::IdentityResolutionFailed);
}
