// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for the matcher
//!
//! Arbitrary regexes must never abort compilation, and a placeholder must
//! always classify the name it was built from.

#![no_main]

use libfuzzer_sys::fuzz_target;

use station_patterns::{PatternEntry, PatternLibrary, PatternMatcher, UNCLASSIFIED};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let (pattern, name) = text.split_once('\n').unwrap_or((text, text));

    let mut library = PatternLibrary::new();
    library.add_entry(
        "Fuzz",
        "Fuzz",
        PatternEntry {
            test_item: "FUZZ".to_string(),
            regexes: vec![pattern.to_string()],
            ..PatternEntry::default()
        },
    );
    library.add_entry(UNCLASSIFIED, UNCLASSIFIED, PatternEntry::placeholder(name, &[]));

    let matcher = PatternMatcher::new(library);
    if !name.is_empty() && name.len() < 256 {
        assert!(matcher.find_match(name).is_some());
    }
});
