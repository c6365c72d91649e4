//! # booking-engine
//!
//! Appointment scheduling core for a service business: clients book a
//! provider for a service, subject to the provider's working hours and to
//! never overlapping another confirmed appointment.
//!
//! ## Modules
//!
//! - [`scheduler`]: `Scheduler`, the explicitly constructed core instance
//! - [`identity`]: converge phone / external account id onto one client
//! - [`catalog`]: service and provider name matching
//! - [`availability`]: fixed-grid slot enumeration and free windows
//! - [`ledger`]: validated booking commits and cancellations
//! - [`overlap`]: half-open intervals and conflict detection
//! - [`store`]: persistence port and its SQLite adapter
//! - [`session`]: turn-by-turn booking conversation state machine
//! - [`seed`]: default catalog and schedule
//! - [`phone`], [`clock`]: boundary formats
//! - [`config`], [`error`]
//!
//! ## Quick start
//!
//! ```rust
//! use booking_engine::{clock, EngineConfig, Scheduler};
//!
//! let scheduler = Scheduler::in_memory(EngineConfig::default()).unwrap();
//! let monday = clock::parse_date("2024-06-03").unwrap();
//! scheduler.seed(monday).unwrap();
//!
//! let anna = scheduler.find_provider("Anna").unwrap();
//! let cut = scheduler.find_service("Women's haircut").unwrap();
//! let slots = scheduler
//!     .available_slots(anna.id, monday, cut.duration_minutes)
//!     .unwrap();
//! assert_eq!(slots.len(), 33);
//!
//! let client = scheduler
//!     .resolve_or_create("Olga", "8 999 123-45-67", None)
//!     .unwrap();
//! scheduler
//!     .create_booking(client, cut.id, anna.id, monday, slots[0].start)
//!     .unwrap();
//! ```

pub mod availability;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod overlap;
pub mod phone;
pub mod scheduler;
pub mod seed;
pub mod session;
pub mod store;
pub mod types;

pub use availability::{FreeWindow, Slot};
pub use catalog::MatchRule;
pub use config::EngineConfig;
pub use error::{BookingError, ErrorKind};
pub use overlap::Interval;
pub use phone::normalize_phone;
pub use scheduler::Scheduler;
pub use session::{BookingSession, Prompt, Sessions, Stage};
pub use store::{SqliteStore, Store};
pub use types::{
    AgendaEntry, Booking, BookingId, BookingStatus, Client, ClientBooking, ClientId, Provider,
    ProviderId, Service, ServiceId, WorkingHours,
};
