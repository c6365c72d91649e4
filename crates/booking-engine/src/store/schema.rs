//! SQLite schema. Dates are `YYYY-MM-DD` text, times `HH:MM` text.

pub(super) const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS clients (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL,
    phone       TEXT NOT NULL UNIQUE,
    external_id INTEGER UNIQUE
);

CREATE TABLE IF NOT EXISTS services (
    id       INTEGER PRIMARY KEY,
    name     TEXT NOT NULL UNIQUE,
    duration INTEGER NOT NULL CHECK (duration > 0),
    price    INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS providers (
    id             INTEGER PRIMARY KEY,
    name           TEXT NOT NULL UNIQUE,
    specialization TEXT
);

CREATE TABLE IF NOT EXISTS working_hours (
    id          INTEGER PRIMARY KEY,
    provider_id INTEGER NOT NULL REFERENCES providers(id),
    date        TEXT NOT NULL,
    start_time  TEXT NOT NULL,
    end_time    TEXT NOT NULL,
    UNIQUE (provider_id, date)
);

CREATE TABLE IF NOT EXISTS bookings (
    id          INTEGER PRIMARY KEY,
    client_id   INTEGER NOT NULL REFERENCES clients(id),
    service_id  INTEGER NOT NULL REFERENCES services(id),
    provider_id INTEGER NOT NULL REFERENCES providers(id),
    date        TEXT NOT NULL,
    start_time  TEXT NOT NULL,
    end_time    TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'confirmed'
                CHECK (status IN ('confirmed', 'cancelled'))
);

CREATE INDEX IF NOT EXISTS idx_bookings_provider_day
    ON bookings (provider_id, date, status);

CREATE INDEX IF NOT EXISTS idx_bookings_client
    ON bookings (client_id, status);
";
