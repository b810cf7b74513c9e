// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for log decoding followed by segmentation
//!
//! Arbitrary bytes exercise the GB18030 fallback path.

#![no_main]

use libfuzzer_sys::fuzz_target;

use station_log::decode::decode_log_bytes;
use station_log::{SegmenterOptions, parse_log};

fuzz_target!(|data: &[u8]| {
    let decoded = decode_log_bytes(data);
    let _ = parse_log(&decoded.text, &SegmenterOptions::default());
});
