//! SQLite-backed implementation of the [`Store`] port.
//!
//! A single connection sits behind a mutex so the store can be shared
//! across threads. Booking commits and cancellations run inside
//! `BEGIN IMMEDIATE` transactions, which also serializes writers that open
//! the same database file from other processes.

use std::path::Path;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{ffi, params, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::{debug, warn};

use super::schema::SCHEMA;
use super::{ClientInsert, Store};
use crate::clock::{self, DATE_FORMAT, TIME_FORMAT};
use crate::error::{BookingError, Result};
use crate::overlap::{self, Interval};
use crate::types::{
    AgendaEntry, Booking, BookingId, BookingStatus, Client, ClientBooking, ClientId, NewBooking,
    Provider, ProviderId, Service, ServiceId, WorkingHours,
};

const BOOKING_COLUMNS: &str =
    "id, client_id, service_id, provider_id, date, start_time, end_time, status";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and apply the schema.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.busy_timeout(busy_timeout)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(path = %path.as_ref().display(), journal_mode = %mode, "opened database");
        Self::init(conn)
    }

    /// A private in-memory database, gone when the store is dropped.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl Store for SqliteStore {
    fn insert_client(
        &self,
        name: &str,
        phone: &str,
        external_id: Option<i64>,
    ) -> Result<ClientInsert> {
        let conn = self.conn.lock();
        match conn.execute(
            "INSERT INTO clients (name, phone, external_id) VALUES (?1, ?2, ?3)",
            params![name, phone, external_id],
        ) {
            Ok(_) => Ok(ClientInsert::Inserted(ClientId(conn.last_insert_rowid()))),
            Err(e) if is_unique_violation(&e) => Ok(ClientInsert::Duplicate),
            Err(e) => Err(e.into()),
        }
    }

    fn get_client(&self, id: ClientId) -> Result<Option<Client>> {
        let conn = self.conn.lock();
        let client = conn
            .query_row(
                "SELECT id, name, phone, external_id FROM clients WHERE id = ?1",
                params![id.0],
                client_from_row,
            )
            .optional()?;
        Ok(client)
    }

    fn find_client_by_phone(&self, phone: &str) -> Result<Option<Client>> {
        let conn = self.conn.lock();
        let client = conn
            .query_row(
                "SELECT id, name, phone, external_id FROM clients WHERE phone = ?1",
                params![phone],
                client_from_row,
            )
            .optional()?;
        Ok(client)
    }

    fn find_client_by_external_id(&self, external_id: i64) -> Result<Option<Client>> {
        let conn = self.conn.lock();
        let client = conn
            .query_row(
                "SELECT id, name, phone, external_id FROM clients WHERE external_id = ?1",
                params![external_id],
                client_from_row,
            )
            .optional()?;
        Ok(client)
    }

    fn backfill_external_id(&self, id: ClientId, external_id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        match conn.execute(
            "UPDATE clients SET external_id = ?1 WHERE id = ?2 AND external_id IS NULL",
            params![external_id, id.0],
        ) {
            Ok(changed) => Ok(changed > 0),
            Err(e) if is_unique_violation(&e) => {
                warn!(client = %id, external_id, "external id already held by another client");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn seed_service(&self, name: &str, duration_minutes: u32, price: i64) -> Result<ServiceId> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR IGNORE INTO services (name, duration, price) VALUES (?1, ?2, ?3)",
            params![name, duration_minutes, price],
        )?;
        let id = conn.query_row(
            "SELECT id FROM services WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(ServiceId(id))
    }

    fn seed_provider(&self, name: &str, specialization: Option<&str>) -> Result<ProviderId> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR IGNORE INTO providers (name, specialization) VALUES (?1, ?2)",
            params![name, specialization],
        )?;
        let id = conn.query_row(
            "SELECT id FROM providers WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(ProviderId(id))
    }

    fn list_services(&self) -> Result<Vec<Service>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT id, name, duration, price FROM services ORDER BY id")?;
        let services = stmt
            .query_map([], service_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(services)
    }

    fn get_service(&self, id: ServiceId) -> Result<Option<Service>> {
        let conn = self.conn.lock();
        let service = conn
            .query_row(
                "SELECT id, name, duration, price FROM services WHERE id = ?1",
                params![id.0],
                service_from_row,
            )
            .optional()?;
        Ok(service)
    }

    fn list_providers(&self) -> Result<Vec<Provider>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id, name, specialization FROM providers ORDER BY id")?;
        let providers = stmt
            .query_map([], provider_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(providers)
    }

    fn get_provider(&self, id: ProviderId) -> Result<Option<Provider>> {
        let conn = self.conn.lock();
        let provider = conn
            .query_row(
                "SELECT id, name, specialization FROM providers WHERE id = ?1",
                params![id.0],
                provider_from_row,
            )
            .optional()?;
        Ok(provider)
    }

    fn put_working_hours(&self, hours: &WorkingHours) -> Result<()> {
        let conn = self.conn.lock();
        match conn.execute(
            "INSERT INTO working_hours (provider_id, date, start_time, end_time)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                hours.provider_id.0,
                clock::format_date(hours.date),
                clock::format_time(hours.start),
                clock::format_time(hours.end),
            ],
        ) {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(BookingError::DuplicateWorkingHours {
                provider: hours.provider_id,
                date: hours.date,
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn working_hours(&self, provider: ProviderId, date: NaiveDate) -> Result<Option<WorkingHours>> {
        let conn = self.conn.lock();
        Ok(query_working_hours(&conn, provider, date)?)
    }

    fn confirmed_bookings(&self, provider: ProviderId, date: NaiveDate) -> Result<Vec<Booking>> {
        let conn = self.conn.lock();
        Ok(query_confirmed(&conn, provider, date)?)
    }

    fn commit_booking(&self, booking: &NewBooking) -> Result<BookingId> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let candidate = Interval::new(booking.start, booking.end);
        let inside = match query_working_hours(&tx, booking.provider_id, booking.date)? {
            Some(hours) => {
                booking.start < booking.end
                    && candidate.within(&Interval::new(hours.start, hours.end))
            }
            None => false,
        };
        if !inside {
            return Err(BookingError::OutsideWorkingHours {
                date: booking.date,
                start: booking.start,
            });
        }

        let booked = query_confirmed(&tx, booking.provider_id, booking.date)?;
        let conflicts = overlap::find_conflicts(&candidate, &booked, |b| {
            Interval::new(b.start, b.end)
        });
        if let Some(conflict) = conflicts.first() {
            return Err(BookingError::SlotConflict {
                date: booking.date,
                start: booking.start,
                end: booking.end,
                conflicting: conflict.booked.id,
                overlap_minutes: conflict.overlap_minutes,
            });
        }

        tx.execute(
            "INSERT INTO bookings
                 (client_id, service_id, provider_id, date, start_time, end_time, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                booking.client_id.0,
                booking.service_id.0,
                booking.provider_id.0,
                clock::format_date(booking.date),
                clock::format_time(booking.start),
                clock::format_time(booking.end),
                BookingStatus::Confirmed.as_str(),
            ],
        )?;
        let id = BookingId(tx.last_insert_rowid());
        tx.commit()?;
        Ok(id)
    }

    fn cancel_booking(&self, id: BookingId) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let status = tx
            .query_row(
                "SELECT status FROM bookings WHERE id = ?1",
                params![id.0],
                |row| status_col(row, 0),
            )
            .optional()?
            .ok_or(BookingError::BookingNotFound(id))?;
        if status != BookingStatus::Confirmed {
            return Err(BookingError::BookingNotConfirmed(id));
        }

        tx.execute(
            "UPDATE bookings SET status = ?1 WHERE id = ?2",
            params![BookingStatus::Cancelled.as_str(), id.0],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM bookings WHERE id = ?1", BOOKING_COLUMNS);
        let booking = conn
            .query_row(&sql, params![id.0], booking_from_row)
            .optional()?;
        Ok(booking)
    }

    fn client_bookings(&self, client: ClientId) -> Result<Vec<ClientBooking>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT b.id, s.name, p.name, b.date, b.start_time, b.end_time
             FROM bookings b
             JOIN services s ON b.service_id = s.id
             JOIN providers p ON b.provider_id = p.id
             WHERE b.client_id = ?1 AND b.status = 'confirmed'
             ORDER BY b.date, b.start_time",
        )?;
        let rows = stmt
            .query_map(params![client.0], |row| {
                Ok(ClientBooking {
                    id: BookingId(row.get(0)?),
                    service_name: row.get(1)?,
                    provider_name: row.get(2)?,
                    date: date_col(row, 3)?,
                    start: time_col(row, 4)?,
                    end: time_col(row, 5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn agenda(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<AgendaEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT b.id, c.name, c.phone, s.name, s.duration, p.name,
                    b.date, b.start_time, b.end_time
             FROM bookings b
             JOIN clients c ON b.client_id = c.id
             JOIN services s ON b.service_id = s.id
             JOIN providers p ON b.provider_id = p.id
             WHERE b.date BETWEEN ?1 AND ?2 AND b.status = 'confirmed'
             ORDER BY b.date, b.start_time, b.id",
        )?;
        let rows = stmt
            .query_map(
                params![clock::format_date(from), clock::format_date(to)],
                |row| {
                    Ok(AgendaEntry {
                        id: BookingId(row.get(0)?),
                        client_name: row.get(1)?,
                        client_phone: row.get(2)?,
                        service_name: row.get(3)?,
                        duration_minutes: row.get(4)?,
                        provider_name: row.get(5)?,
                        date: date_col(row, 6)?,
                        start: time_col(row, 7)?,
                        end: time_col(row, 8)?,
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn query_working_hours(
    conn: &Connection,
    provider: ProviderId,
    date: NaiveDate,
) -> rusqlite::Result<Option<WorkingHours>> {
    conn.query_row(
        "SELECT provider_id, date, start_time, end_time
         FROM working_hours WHERE provider_id = ?1 AND date = ?2",
        params![provider.0, clock::format_date(date)],
        |row| {
            Ok(WorkingHours {
                provider_id: ProviderId(row.get(0)?),
                date: date_col(row, 1)?,
                start: time_col(row, 2)?,
                end: time_col(row, 3)?,
            })
        },
    )
    .optional()
}

fn query_confirmed(
    conn: &Connection,
    provider: ProviderId,
    date: NaiveDate,
) -> rusqlite::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {} FROM bookings
         WHERE provider_id = ?1 AND date = ?2 AND status = 'confirmed'
         ORDER BY start_time",
        BOOKING_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let bookings = stmt
        .query_map(params![provider.0, clock::format_date(date)], booking_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(bookings)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn client_from_row(row: &Row<'_>) -> rusqlite::Result<Client> {
    Ok(Client {
        id: ClientId(row.get(0)?),
        name: row.get(1)?,
        phone: row.get(2)?,
        external_id: row.get(3)?,
    })
}

fn service_from_row(row: &Row<'_>) -> rusqlite::Result<Service> {
    Ok(Service {
        id: ServiceId(row.get(0)?),
        name: row.get(1)?,
        duration_minutes: row.get(2)?,
        price: row.get(3)?,
    })
}

fn provider_from_row(row: &Row<'_>) -> rusqlite::Result<Provider> {
    Ok(Provider {
        id: ProviderId(row.get(0)?),
        name: row.get(1)?,
        specialization: row.get(2)?,
    })
}

fn booking_from_row(row: &Row<'_>) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: BookingId(row.get(0)?),
        client_id: ClientId(row.get(1)?),
        service_id: ServiceId(row.get(2)?),
        provider_id: ProviderId(row.get(3)?),
        date: date_col(row, 4)?,
        start: time_col(row, 5)?,
        end: time_col(row, 6)?,
        status: status_col(row, 7)?,
    })
}

fn date_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn time_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveTime> {
    let raw: String = row.get(idx)?;
    NaiveTime::parse_from_str(&raw, TIME_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn status_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<BookingStatus> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: BookingError| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.to_string().into())
        })
}
