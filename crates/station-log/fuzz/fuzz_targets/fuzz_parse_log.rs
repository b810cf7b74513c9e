// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for block segmentation
//!
//! `parse_log` must accept any text and account for every line.

#![no_main]

use libfuzzer_sys::fuzz_target;

use station_log::{SegmenterOptions, parse_log};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let outcome = parse_log(input, &SegmenterOptions::default());
        let consumed: usize = outcome.blocks.iter().map(|b| b.log_details().len()).sum();
        assert_eq!(consumed + outcome.stats.blank_lines, outcome.stats.total_lines);
    }
});
