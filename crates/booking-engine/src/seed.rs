//! Catalog and schedule seeding.
//!
//! Seeding is idempotent: services and providers are matched by name and
//! working hours that already exist for a provider-day are left alone.

use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;
use tracing::info;

use crate::config::SeedConfig;
use crate::error::{BookingError, Result};
use crate::store::Store;
use crate::types::WorkingHours;

/// What a seeding run wrote. Entries that already existed are not counted,
/// so a repeated run reports zeros.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub services_added: usize,
    pub providers_added: usize,
    pub working_days_added: usize,
}

/// Seed the catalog and give every provider the configured hours on each
/// working day in `[today, today + days_ahead)`.
pub fn seed<S: Store + ?Sized>(
    store: &S,
    config: &SeedConfig,
    today: NaiveDate,
) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    let known: HashSet<String> = store.list_services()?.into_iter().map(|s| s.name).collect();
    for service in &config.services {
        store.seed_service(&service.name, service.duration_minutes, service.price)?;
        if !known.contains(&service.name) {
            report.services_added += 1;
        }
    }

    let known: HashSet<String> = store.list_providers()?.into_iter().map(|p| p.name).collect();
    let mut providers = Vec::with_capacity(config.providers.len());
    for provider in &config.providers {
        providers.push(store.seed_provider(&provider.name, provider.specialization.as_deref())?);
        if !known.contains(&provider.name) {
            report.providers_added += 1;
        }
    }

    for date in working_days(today, config.days_ahead, config.weekdays_only) {
        for provider_id in &providers {
            let hours = WorkingHours {
                provider_id: *provider_id,
                date,
                start: config.day_start,
                end: config.day_end,
            };
            match store.put_working_hours(&hours) {
                Ok(()) => report.working_days_added += 1,
                Err(BookingError::DuplicateWorkingHours { .. }) => {}
                Err(e) => return Err(e),
            }
        }
    }

    info!(
        services_added = report.services_added,
        providers_added = report.providers_added,
        working_days_added = report.working_days_added,
        "seed complete"
    );
    Ok(report)
}

fn working_days(from: NaiveDate, days: u32, weekdays_only: bool) -> Vec<NaiveDate> {
    (0..i64::from(days))
        .filter_map(|offset| from.checked_add_signed(Duration::days(offset)))
        .filter(|date| !weekdays_only || !matches!(date.weekday(), Weekday::Sat | Weekday::Sun))
        .collect()
}
