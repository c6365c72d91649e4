//! `salon` CLI: a front desk over the booking engine.
//!
//! Every command prints JSON on stdout; logs go to stderr and are filtered
//! with `RUST_LOG` (default `warn`).
//!
//! ## Usage
//!
//! ```sh
//! # Create the database and seed two weeks of working days
//! salon --db salon.db init --today 2024-06-03
//!
//! # What can be booked?
//! salon --db salon.db services
//! salon --db salon.db slots --provider Anna --service "Women's haircut" --date 2024-06-03
//!
//! # Book, list and cancel
//! salon --db salon.db book --name Olga --phone "8 999 123-45-67" \
//!     --service "Women's haircut" --provider Anna --date 2024-06-03 --time 10:00
//! salon --db salon.db bookings --phone +79991234567
//! salon --db salon.db cancel 1
//!
//! # Admin views
//! salon --db salon.db agenda --from 2024-06-03 --to 2024-06-07
//! salon --db salon.db hours set --provider Anna --date 2024-06-08 --start 11:00 --end 15:00
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use booking_engine::{clock, BookingId, EngineConfig, Provider, Scheduler};
use chrono::{Local, NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "salon", version, about = "Appointment booking front desk")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database file (overrides the config file and SALON_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the schema and seed the default catalog and schedule
    Init {
        /// First day of the seeded schedule (defaults to today)
        #[arg(long, value_parser = parse_date)]
        today: Option<NaiveDate>,
    },
    /// List services
    Services,
    /// List providers
    Providers,
    /// Bookable slots for one provider on one date
    Slots {
        #[arg(long)]
        provider: String,
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
        #[command(flatten)]
        length: SlotLength,
    },
    /// Gaps between bookings in a provider's day
    Free {
        #[arg(long)]
        provider: String,
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
    },
    /// Resolve (or create) the client and book an appointment
    Book {
        #[command(flatten)]
        client: ClientArgs,
        #[arg(long)]
        service: String,
        #[arg(long)]
        provider: String,
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
        #[arg(long, value_parser = parse_time)]
        time: NaiveTime,
    },
    /// Cancel a booking by id
    Cancel { id: i64 },
    /// Show one booking
    Show { id: i64 },
    /// A client's upcoming confirmed bookings
    Bookings {
        #[arg(long, required_unless_present = "external_id")]
        phone: Option<String>,
        #[arg(long)]
        external_id: Option<i64>,
    },
    /// Resolve (or create) a client and print it
    Resolve {
        #[command(flatten)]
        client: ClientArgs,
    },
    /// Confirmed bookings across all providers in a date range
    Agenda {
        #[arg(long, value_parser = parse_date)]
        from: NaiveDate,
        /// Last day, inclusive (defaults to --from)
        #[arg(long, value_parser = parse_date)]
        to: Option<NaiveDate>,
    },
    /// Provider working hours
    #[command(subcommand)]
    Hours(HoursCommand),
}

#[derive(Subcommand)]
enum HoursCommand {
    /// Define working hours for one date
    Set {
        #[arg(long)]
        provider: String,
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
        #[arg(long, value_parser = parse_time)]
        start: NaiveTime,
        #[arg(long, value_parser = parse_time)]
        end: NaiveTime,
    },
    /// Show working hours for one date
    Show {
        #[arg(long)]
        provider: String,
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct SlotLength {
    /// Use this service's duration
    #[arg(long)]
    service: Option<String>,
    /// Explicit duration in minutes
    #[arg(long)]
    duration: Option<u32>,
}

#[derive(Args)]
struct ClientArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    phone: String,
    /// Messenger account id
    #[arg(long)]
    external_id: Option<i64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let mut config =
        EngineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(db) = cli.db {
        config.database_path = db;
    }
    debug!(database = %config.database_path.display(), "opening scheduler");
    let scheduler = Scheduler::open(config).context("Failed to open database")?;

    run(&scheduler, cli.command)
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(scheduler: &Scheduler, command: Commands) -> Result<()> {
    match command {
        Commands::Init { today } => {
            let today = today.unwrap_or_else(|| Local::now().date_naive());
            let report = scheduler.seed(today).context("Failed to seed")?;
            print_json(&report)
        }
        Commands::Services => print_json(&scheduler.list_services()?),
        Commands::Providers => print_json(&scheduler.list_providers()?),
        Commands::Slots {
            provider,
            date,
            length,
        } => {
            let provider = find_provider(scheduler, &provider)?;
            let duration = match (length.service, length.duration) {
                (Some(service), _) => {
                    scheduler
                        .find_service(&service)
                        .with_context(|| format!("Unknown service: '{}'", service))?
                        .duration_minutes
                }
                (None, Some(minutes)) => minutes,
                (None, None) => bail!("either --service or --duration is required"),
            };
            let slots = scheduler
                .available_slots(provider.id, date, duration)
                .context("Failed to compute slots")?;
            print_json(&slots)
        }
        Commands::Free { provider, date } => {
            let provider = find_provider(scheduler, &provider)?;
            print_json(&scheduler.free_windows(provider.id, date)?)
        }
        Commands::Book {
            client,
            service,
            provider,
            date,
            time,
        } => {
            let service = scheduler
                .find_service(&service)
                .with_context(|| format!("Unknown service: '{}'", service))?;
            let provider = find_provider(scheduler, &provider)?;
            let client_id = scheduler
                .resolve_or_create(&client.name, &client.phone, client.external_id)
                .context("Failed to resolve client")?;
            let id = scheduler
                .create_booking(client_id, service.id, provider.id, date, time)
                .context("Booking rejected")?;
            print_json(&scheduler.get_booking(id)?)
        }
        Commands::Cancel { id } => {
            let id = BookingId(id);
            scheduler.cancel_booking(id).context("Failed to cancel")?;
            print_json(&scheduler.get_booking(id)?)
        }
        Commands::Show { id } => print_json(&scheduler.get_booking(BookingId(id))?),
        Commands::Bookings { phone, external_id } => {
            let bookings = match scheduler.find_client(phone.as_deref(), external_id)? {
                Some(client) => scheduler.list_client_bookings(client)?,
                None => Vec::new(),
            };
            print_json(&bookings)
        }
        Commands::Resolve { client } => {
            let id = scheduler
                .resolve_or_create(&client.name, &client.phone, client.external_id)
                .context("Failed to resolve client")?;
            print_json(&scheduler.get_client(id)?)
        }
        Commands::Agenda { from, to } => print_json(&scheduler.agenda(from, to.unwrap_or(from))?),
        Commands::Hours(HoursCommand::Set {
            provider,
            date,
            start,
            end,
        }) => {
            let provider = find_provider(scheduler, &provider)?;
            scheduler
                .set_working_hours(provider.id, date, start, end)
                .context("Failed to set working hours")?;
            print_json(&scheduler.working_hours(provider.id, date)?)
        }
        Commands::Hours(HoursCommand::Show { provider, date }) => {
            let provider = find_provider(scheduler, &provider)?;
            print_json(&scheduler.working_hours(provider.id, date)?)
        }
    }
}

fn find_provider(scheduler: &Scheduler, name: &str) -> Result<Provider> {
    scheduler
        .find_provider(name)
        .with_context(|| format!("Unknown provider: '{}'", name))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

fn parse_date(raw: &str) -> std::result::Result<NaiveDate, String> {
    clock::parse_date(raw).map_err(|e| e.to_string())
}

fn parse_time(raw: &str) -> std::result::Result<NaiveTime, String> {
    clock::parse_time(raw).map_err(|e| e.to_string())
}
