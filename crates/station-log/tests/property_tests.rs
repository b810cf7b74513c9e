// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Property-based tests for station-log
//!
//! These tests use proptest to check that segmentation is total over
//! arbitrary input and that its output is stable under serialization.

use proptest::prelude::*;
use station_log::{
    BlockStatus, MeasurementStatus, SegmenterOptions, blocks_from_json, blocks_to_json,
    classify_line, extract_measurement, parse_log,
};

// ============================================================================
// Strategies
// ============================================================================

fn timestamp() -> impl Strategy<Value = String> {
    (0u32..24, 0u32..60, 0u32..60, 0u32..1000)
        .prop_map(|(h, m, s, ms)| format!("2025-09-15 {h:02}:{m:02}:{s:02},{ms:03}"))
}

fn test_name() -> impl Strategy<Value = String> {
    "[A-Z][A-Z0-9_]{2,30}"
}

/// A line that matches the station grammar
fn station_line() -> impl Strategy<Value = String> {
    (
        timestamp(),
        prop_oneof![
            Just("SYSTEM".to_string()),
            Just("END_OF_TEST".to_string()),
            test_name()
        ],
        prop_oneof![
            Just("Step"),
            Just("Header"),
            Just("Footer"),
            Just("EvalAndLogResults")
        ],
        "[ -~]{0,60}",
    )
        .prop_map(|(ts, ctx, kw, msg)| {
            format!("{ts} [] INFO  TEST_APP_2010\t13:00:00.0000001\t{ctx}\t{kw}\t{msg}")
        })
}

/// A line that can never match the grammar
fn noise_line() -> impl Strategy<Value = String> {
    "[a-z ]{0,10}[a-z]{1,5}[^\n\r]{0,40}"
}

fn header(ts: &str, name: &str) -> String {
    format!(
        "{ts} [] INFO  TEST_APP_2010\t13:00:00.0000001\t{name}\tHeader\t===== Test = {name} | Barcode = BC123 ====="
    )
}

fn footer(ts: &str, name: &str, code: &str, ms: u32) -> String {
    format!(
        "{ts} [] INFO  TEST_APP_2010\t13:00:00.0000001\t{name}\tFooter\tTest = {name} | Overall Result = {code} | Test Time = {ms} msec"
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Segmentation never panics and accounts for every line
    #[test]
    fn prop_parse_is_total(lines in prop::collection::vec(
        prop_oneof![station_line(), noise_line(), ".{0,80}"], 0..60)
    ) {
        let content = lines.join("\n");
        let outcome = parse_log(&content, &SegmenterOptions::default());

        let consumed: usize = outcome.blocks.iter().map(|b| b.log_details().len()).sum();
        let stats = &outcome.stats;
        prop_assert_eq!(consumed + stats.blank_lines, stats.total_lines);
        prop_assert_eq!(stats.parsed_lines + stats.unparsable_lines + stats.blank_lines, stats.total_lines);
    }

    /// Lines outside the grammar appear verbatim in exactly one block
    #[test]
    fn prop_unparsable_lines_are_preserved(
        name in test_name(),
        noise in prop::collection::vec(noise_line(), 1..8),
    ) {
        let mut lines = vec![header("2025-09-15 13:00:00,000", &name)];
        lines.extend(noise.iter().cloned());
        lines.push(footer("2025-09-15 13:00:01,000", &name, "0", 1000));
        let outcome = parse_log(&lines.join("\n"), &SegmenterOptions::default());

        prop_assert_eq!(outcome.blocks.len(), 1);
        for n in &noise {
            prop_assert!(classify_line(1, n).parsed().is_none());
            prop_assert!(outcome.blocks[0].log_details().contains(n));
        }
    }

    /// Footer code "0" is pass, anything else is fail
    #[test]
    fn prop_footer_code_decides_status(
        name in test_name(),
        code in prop_oneof![Just("0".to_string()), "-?[1-9][0-9]{0,3}", "[A-Z]{1,4}"],
        ms in 0u32..1_000_000,
    ) {
        let lines = [
            header("2025-09-15 13:00:00,000", &name),
            footer("2025-09-15 13:00:01,000", &name, &code, ms),
        ];
        let outcome = parse_log(&lines.join("\n"), &SegmenterOptions::default());
        let item = outcome.blocks[0].as_test_item().expect("test item");

        let expected = if code == "0" { BlockStatus::Pass } else { BlockStatus::Fail };
        prop_assert_eq!(item.status, expected);
        prop_assert_eq!(item.duration_ms, Some(f64::from(ms)));
    }

    /// The last status token before the marker decides the verdict
    #[test]
    fn prop_last_status_token_wins(
        description_flag in prop_oneof![Just(""), Just("FAILED "), Just("PASSED ")],
        failed in any::<bool>(),
    ) {
        let status = if failed { "* FAILED *" } else { "PASSED" };
        let message = format!(
            "1 2 {description_flag}gain check 0 10 5 dB 10 9 {status} <--*--> 1 FALSE FALSE G01"
        );
        let item = extract_measurement(1, None, &message).expect("well-formed measurement");
        let expected = if failed { MeasurementStatus::Fail } else { MeasurementStatus::Pass };
        prop_assert_eq!(item.status, expected);
    }

    /// Re-serializing parsed blocks reproduces identical values
    #[test]
    fn prop_json_round_trip(lines in prop::collection::vec(station_line(), 0..40)) {
        let outcome = parse_log(&lines.join("\n"), &SegmenterOptions::default());
        let json = blocks_to_json(&outcome.blocks).expect("serialize");
        let reloaded = blocks_from_json(&json).expect("deserialize");
        prop_assert_eq!(&reloaded, &outcome.blocks);
    }
}
