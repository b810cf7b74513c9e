// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for `EvalAndLogResults` extraction

#![no_main]

use libfuzzer_sys::fuzz_target;

use station_log::extract_measurement;

fuzz_target!(|data: &[u8]| {
    if let Ok(message) = std::str::from_utf8(data) {
        // Errors are expected; panics are not
        let _ = extract_measurement(1, None, message);
    }
});
