// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

use criterion::{Criterion, criterion_group, criterion_main};
use station_patterns::{PatternEntry, PatternLibrary, PatternMatcher, UNCLASSIFIED};

const FIXTURE: &str = include_str!("../tests/fixtures/patterns.json");

/// Fixture library followed by `n` placeholder entries
fn large_library(n: usize) -> PatternLibrary {
    let mut library = PatternLibrary::from_json(FIXTURE).unwrap_or_default();
    for i in 0..n {
        library.add_entry(
            UNCLASSIFIED,
            UNCLASSIFIED,
            PatternEntry::placeholder(&format!("RF_TX_POWER_CH{i}_ANT1"), &[]),
        );
    }
    library
}

fn matcher_benchmark(c: &mut Criterion) {
    let fixture = PatternMatcher::new(large_library(0));
    let large = PatternMatcher::new(large_library(2_000));

    c.bench_function("match_first_entry", |b| {
        b.iter(|| {
            fixture.find_match(std::hint::black_box(
                "AUDIO_L2AR_ALERT_RIGHT_14600_16KHz_TO_7KHz_MIC2_PORTO",
            ))
        })
    });

    c.bench_function("match_miss_large_library", |b| {
        b.iter(|| large.find_match(std::hint::black_box("WIFI_RSSI_5G_CH36")))
    });

    c.bench_function("compile_large_library", |b| {
        b.iter_batched(
            || large_library(2_000),
            PatternMatcher::new,
            criterion::BatchSize::LargeInput,
        )
    });

    c.bench_function("parse_library_json", |b| {
        b.iter(|| PatternLibrary::from_json(std::hint::black_box(FIXTURE)))
    });
}

criterion_group!(benches, matcher_benchmark);
criterion_main!(benches);
