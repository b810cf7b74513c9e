// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Property-based tests for station-triage
//!
//! Generated logs of passing and failing test items check that every failed
//! test is reported exactly once and that recorded runs mirror the parse.

use proptest::prelude::*;
use station_log::{SegmenterOptions, parse_log};
use station_patterns::PatternLibrary;
use station_triage::db::Database;
use station_triage::triage::{Classification, TriageOptions, Triager};

const LIBRARY: &str = r#"{
  "Audio": {"Mic": [{"TEST ITEMS": "MIC_CHECK_1", "List of Regular Expressions": ["^MIC_CHECK_\\d+"]}]},
  "RF": {"WiFi": [{"TEST ITEMS": "WIFI_TX_2G", "List of Regular Expressions": ["^WIFI_TX_(2G|5G)"]}]}
}"#;

fn test_item(name: &str, code: u8) -> String {
    format!(
        "2025-09-15 13:00:00,000 [] INFO  TEST_APP_2010\t13:00:00.0000000\t{name}\tHeader\t===== Test = {name} | Barcode = SN1 =====\n\
         2025-09-15 13:00:01,000 [] INFO  TEST_APP_2010\t13:00:01.0000000\t{name}\tFooter\tTest = {name} | Overall Result = {code} | Test Time = 1000 msec\n\
         2025-09-15 13:00:01,001 [] INFO  TEST_APP_2010\t13:00:01.0010000\tEND_OF_TEST\tFooter\tdone\n"
    )
}

fn items() -> impl Strategy<Value = Vec<(String, u8)>> {
    prop::collection::vec(
        (
            prop_oneof![
                "MIC_CHECK_[0-9]{1,2}",
                "WIFI_TX_(2G|5G)",
                "[A-Z]{3,8}_[A-Z0-9]{1,6}",
            ],
            0u8..4,
        ),
        0..12,
    )
}

fn library() -> PatternLibrary {
    PatternLibrary::from_json(LIBRARY).expect("library")
}

proptest! {
    #[test]
    fn every_failed_test_is_reported_once(items in items()) {
        let log: String = items.iter().map(|(name, code)| test_item(name, *code)).collect();
        let outcome = parse_log(&log, &SegmenterOptions::default());
        let report = Triager::with_library(library(), TriageOptions::default()).triage(&outcome.blocks);

        let expected: Vec<&str> = items
            .iter()
            .filter(|(_, code)| *code != 0)
            .map(|(name, _)| name.as_str())
            .collect();
        let reported: Vec<&str> = report.records.iter().map(|r| r.test_name.as_str()).collect();
        prop_assert_eq!(reported, expected);
        prop_assert_eq!(report.matched_count() + report.unmatched_count(), report.records.len());
        prop_assert!(report.records.iter().all(|r| r.classification != Classification::Uncategorized));
    }

    #[test]
    fn triage_is_deterministic(items in items()) {
        let log: String = items.iter().map(|(name, code)| test_item(name, *code)).collect();
        let outcome = parse_log(&log, &SegmenterOptions::default());

        let first = Triager::with_library(library(), TriageOptions::default()).triage(&outcome.blocks);
        let second = Triager::with_library(library(), TriageOptions::default()).triage(&outcome.blocks);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn recorded_runs_mirror_the_parse(items in items()) {
        let log: String = items.iter().map(|(name, code)| test_item(name, *code)).collect();
        let outcome = parse_log(&log, &SegmenterOptions::default());
        let report = Triager::with_library(library(), TriageOptions::default()).triage(&outcome.blocks);

        let mut db = Database::in_memory().expect("db");
        db.initialize().expect("init");
        db.record_run("generated.log", &outcome, &report).expect("record");

        prop_assert_eq!(db.count("test_items").expect("count"), outcome.stats.test_items as i64);
        prop_assert_eq!(db.count("triage_results").expect("count"), report.records.len() as i64);

        let runs = db.recent_runs(1).expect("runs");
        prop_assert_eq!(runs[0].failed_test_items, outcome.stats.failed_test_items as i64);
        prop_assert_eq!(runs[0].matched, report.matched_count() as i64);
    }
}
