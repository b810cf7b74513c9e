// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

use criterion::{Criterion, criterion_group, criterion_main};
use station_log::{SegmenterOptions, parse_log};
use station_patterns::PatternLibrary;
use station_triage::db::Database;
use station_triage::triage::{TriageOptions, Triager};

const LOG: &str = include_str!("../tests/fixtures/triage_run.log");
const LIBRARY: &str = include_str!("../tests/fixtures/patterns.json");

/// The fixture log repeated `n` times
fn long_log(n: usize) -> String {
    LOG.repeat(n)
}

fn triage_benchmarks(c: &mut Criterion) {
    let library = PatternLibrary::from_json(LIBRARY).unwrap_or_default();
    let options = TriageOptions {
        register_unmatched: false,
        ..TriageOptions::default()
    };
    let outcome = parse_log(&long_log(200), &SegmenterOptions::default());

    let mut group = c.benchmark_group("triage");

    group.bench_function("classify_800_items", |b| {
        let mut triager = Triager::with_library(library.clone(), options);
        b.iter(|| triager.triage(std::hint::black_box(&outcome.blocks)))
    });

    group.bench_function("classify_with_prompts", |b| {
        let mut triager = Triager::with_library(
            library.clone(),
            TriageOptions {
                build_prompts: true,
                ..options
            },
        );
        b.iter(|| triager.triage(std::hint::black_box(&outcome.blocks)))
    });

    group.bench_function("record_run", |b| {
        let mut db = Database::in_memory().expect("Failed to create in-memory database");
        db.initialize().expect("Failed to initialize database");
        let report = Triager::with_library(library.clone(), options).triage(&outcome.blocks);
        b.iter(|| {
            db.record_run("bench.log", &outcome, &report)
                .expect("record failed")
        })
    });

    group.finish();
}

criterion_group!(benches, triage_benchmarks);
criterion_main!(benches);
