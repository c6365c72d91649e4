//! Property-based tests for slot enumeration, booking commits and phone
//! normalization.
//!
//! Times are generated as minutes after midnight so that every generated
//! interval stays within one day.

use booking_engine::availability::compute_slots;
use booking_engine::{
    normalize_phone, BookingId, EngineConfig, Interval, ProviderId, Scheduler, Store, WorkingHours,
};
use chrono::{NaiveDate, NaiveTime};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn at(minutes: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0).unwrap()
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
}

/// Working hours of at least one hour, starting between 06:00 and 12:00.
fn arb_hours() -> impl Strategy<Value = (u32, u32)> {
    (360u32..720, 60u32..720).prop_map(|(start, len)| (start, (start + len).min(23 * 60 + 59)))
}

/// Booked intervals anywhere in the day; they may overlap each other.
fn arb_booked() -> impl Strategy<Value = Vec<Interval>> {
    prop::collection::vec((0u32..1380, 5u32..180), 0..8).prop_map(|raw| {
        raw.into_iter()
            .map(|(start, len)| Interval::new(at(start), at((start + len).min(1439))))
            .collect()
    })
}

fn arb_duration() -> impl Strategy<Value = u32> {
    prop_oneof![Just(30u32), Just(60), Just(90), Just(120), 1u32..240]
}

fn arb_step() -> impl Strategy<Value = u32> {
    prop_oneof![Just(15u32), Just(30), 1u32..60]
}

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    }
}

fn hours(start: u32, end: u32) -> WorkingHours {
    WorkingHours {
        provider_id: ProviderId(1),
        date: day(),
        start: at(start),
        end: at(end),
    }
}

// ---------------------------------------------------------------------------
// Slots stay inside working hours and come back in start order
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn slots_fit_hours_and_are_sorted(
        (start, end) in arb_hours(),
        booked in arb_booked(),
        duration in arb_duration(),
        step in arb_step(),
    ) {
        let hours = hours(start, end);
        let slots = compute_slots(&hours, &booked, duration, step);

        for slot in &slots {
            prop_assert!(slot.start >= hours.start && slot.end <= hours.end, "{:?}", slot);
            prop_assert_eq!(slot.duration_minutes(), i64::from(duration));
        }
        for pair in slots.windows(2) {
            prop_assert!(pair[0].start < pair[1].start);
        }
        prop_assert_eq!(compute_slots(&hours, &booked, duration, step), slots);
    }
}

// ---------------------------------------------------------------------------
// No offered slot overlaps a booked interval
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn slots_never_overlap_bookings(
        (start, end) in arb_hours(),
        booked in arb_booked(),
        duration in arb_duration(),
    ) {
        let slots = compute_slots(&hours(start, end), &booked, duration, 15);
        for slot in &slots {
            for b in &booked {
                prop_assert!(!slot.overlaps(b), "{:?} overlaps {:?}", slot, b);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Grid points that fit and are free are never skipped
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn every_free_grid_point_is_offered(
        (start, end) in arb_hours(),
        booked in arb_booked(),
        duration in arb_duration(),
    ) {
        let slots = compute_slots(&hours(start, end), &booked, duration, 15);
        let mut t = start;
        while t + duration <= end {
            let candidate = Interval::new(at(t), at(t + duration));
            let free = booked.iter().all(|b| !candidate.overlaps(b));
            prop_assert_eq!(free, slots.contains(&candidate), "{:?}", candidate);
            t += 15;
        }
    }
}

// ---------------------------------------------------------------------------
// Random commit / cancel sequences never leave overlapping bookings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Op {
    Book { quarter: u32, service: usize },
    Cancel { nth: usize },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u32..40, 0usize..3).prop_map(|(quarter, service)| Op::Book { quarter, service }),
        1 => (0usize..16).prop_map(|nth| Op::Cancel { nth }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, ..ProptestConfig::default() })]

    #[test]
    fn confirmed_bookings_never_overlap(ops in prop::collection::vec(arb_op(), 1..30)) {
        let scheduler = Scheduler::in_memory(EngineConfig::default()).unwrap();
        let provider = scheduler.store().seed_provider("P", None).unwrap();
        let services = [
            scheduler.store().seed_service("Short", 30, 800).unwrap(),
            scheduler.store().seed_service("Hour", 60, 1500).unwrap(),
            scheduler.store().seed_service("Long", 120, 3000).unwrap(),
        ];
        scheduler.set_working_hours(provider, day(), at(600), at(1140)).unwrap();
        let client = scheduler.resolve_or_create("C", "89991234567", None).unwrap();

        let mut made: Vec<BookingId> = Vec::new();
        for op in ops {
            match op {
                Op::Book { quarter, service } => {
                    let start = at(600 + quarter * 15);
                    if let Ok(id) = scheduler.create_booking(
                        client, services[service], provider, day(), start,
                    ) {
                        made.push(id);
                    }
                }
                Op::Cancel { nth } => {
                    if let Some(id) = made.get(nth) {
                        let _ = scheduler.cancel_booking(*id);
                    }
                }
            }

            let booked = scheduler.store().confirmed_bookings(provider, day()).unwrap();
            for (i, a) in booked.iter().enumerate() {
                prop_assert!(a.start >= at(600) && a.end <= at(1140));
                for b in &booked[i + 1..] {
                    prop_assert!(a.end <= b.start || b.end <= a.start, "{:?} / {:?}", a, b);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Phone normalization
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn normalization_is_idempotent(raw in "[0-9 ()+-]{1,24}") {
        if let Ok(once) = normalize_phone(&raw) {
            prop_assert_eq!(normalize_phone(&once).unwrap(), once);
        }
    }

    #[test]
    fn national_spellings_are_equivalent(subscriber in "[0-9]{10}") {
        let canonical = normalize_phone(&format!("+7{subscriber}")).unwrap();
        prop_assert_eq!(normalize_phone(&format!("8{subscriber}")).unwrap(), canonical.clone());
        prop_assert_eq!(normalize_phone(&format!("7{subscriber}")).unwrap(), canonical.clone());
        prop_assert_eq!(canonical, format!("+7{subscriber}"));
    }
}
