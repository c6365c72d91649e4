//! Slot enumeration benchmarks.
//!
//! Run with: `cargo bench --bench slots -p booking-engine`

use std::hint::black_box;

use booking_engine::availability::{compute_slots, free_windows};
use booking_engine::{Interval, ProviderId, WorkingHours};
use chrono::{NaiveDate, NaiveTime};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn at(minutes: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0).unwrap()
}

fn salon_day() -> WorkingHours {
    WorkingHours {
        provider_id: ProviderId(1),
        date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        start: at(10 * 60),
        end: at(19 * 60),
    }
}

/// `count` one-hour bookings spread over the day with gaps between them.
fn bookings(count: u32) -> Vec<Interval> {
    (0..count)
        .map(|i| {
            let start = 10 * 60 + (i * 75) % (8 * 60);
            Interval::new(at(start), at(start + 60))
        })
        .collect()
}

fn bench_compute_slots(c: &mut Criterion) {
    let hours = salon_day();
    let mut group = c.benchmark_group("compute_slots");

    for count in [0u32, 4, 8] {
        let booked = bookings(count);
        group.bench_with_input(BenchmarkId::new("bookings", count), &booked, |b, booked| {
            b.iter(|| compute_slots(black_box(&hours), black_box(booked), 60, 15))
        });
    }

    let booked = bookings(4);
    for step in [5u32, 15, 30] {
        group.bench_with_input(BenchmarkId::new("step", step), &step, |b, &step| {
            b.iter(|| compute_slots(black_box(&hours), black_box(&booked), 60, step))
        });
    }
    group.finish();
}

fn bench_free_windows(c: &mut Criterion) {
    let hours = salon_day();
    let booked = bookings(6);
    c.bench_function("free_windows", |b| {
        b.iter(|| free_windows(black_box(&hours), black_box(&booked)))
    });
}

criterion_group!(benches, bench_compute_slots, bench_free_windows);
criterion_main!(benches);
