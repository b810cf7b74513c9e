// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for library documents
//!
//! Any document that parses must serialize and parse back to itself.

#![no_main]

use libfuzzer_sys::fuzz_target;

use station_patterns::PatternLibrary;

fuzz_target!(|data: &[u8]| {
    if let Ok(json) = std::str::from_utf8(data)
        && let Ok(library) = PatternLibrary::from_json(json)
    {
        let text = library.to_json_pretty().expect("parsed library serializes");
        let back = PatternLibrary::from_json(&text).expect("serialized library parses");
        assert_eq!(back, library);
    }
});
