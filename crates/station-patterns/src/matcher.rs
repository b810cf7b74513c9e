// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! First-match-wins classification of test names
//!
//! Every regex is compiled once, wrapped as `^(?:...)` so it must match at
//! the start of the name but need not consume all of it. Matching walks
//! groups, categories, entries and each entry's regex list in document order
//! and stops at the first hit; there is no scoring.
//!
//! Curated regexes may use lookaround and backreferences, so they are
//! compiled with `fancy_regex`. Patterns without those features run on the
//! plain `regex` engine underneath.

use fancy_regex::Regex;
use tracing::{debug, warn};

use crate::entry::PatternEntry;
use crate::library::PatternLibrary;

/// A successful lookup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternMatch<'a> {
    /// Group the entry was found under
    pub test_group: &'a str,
    /// Category the entry was found under
    pub key_parts: &'a str,
    /// The matched entry
    pub entry: &'a PatternEntry,
    /// The regex that matched, as written in the library
    pub pattern: &'a str,
    /// Position of that regex in the entry's list
    pub pattern_index: usize,
}

/// A regex that could not be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPattern {
    /// Template name of the owning entry
    pub test_item: String,
    /// The regex as written
    pub pattern: String,
    /// Compiler message
    pub reason: String,
}

#[derive(Debug)]
struct CompiledEntry {
    group: usize,
    category: usize,
    entry: usize,
    /// (index in the entry's list, compiled regex)
    regexes: Vec<(usize, Regex)>,
}

/// A library with its regexes compiled
#[derive(Debug)]
pub struct PatternMatcher {
    library: PatternLibrary,
    compiled: Vec<CompiledEntry>,
    invalid: Vec<InvalidPattern>,
}

impl PatternMatcher {
    /// Compile every regex in the library
    ///
    /// Regexes that fail to compile are logged, recorded in
    /// [`invalid_patterns`](Self::invalid_patterns) and skipped; the rest of
    /// the entry stays usable.
    #[must_use]
    pub fn new(library: PatternLibrary) -> Self {
        let mut compiled = Vec::new();
        let mut invalid = Vec::new();

        for (g, group) in library.groups().iter().enumerate() {
            for (c, category) in group.categories.iter().enumerate() {
                for (e, entry) in category.entries.iter().enumerate() {
                    let mut regexes = Vec::with_capacity(entry.regexes.len());
                    for (i, pattern) in entry.regexes.iter().enumerate() {
                        match compile_anchored(pattern) {
                            Ok(re) => regexes.push((i, re)),
                            Err(err) => {
                                warn!(
                                    test_item = %entry.test_item,
                                    pattern = %pattern,
                                    error = %err,
                                    "Skipping invalid library regex"
                                );
                                invalid.push(InvalidPattern {
                                    test_item: entry.test_item.clone(),
                                    pattern: pattern.clone(),
                                    reason: err.to_string(),
                                });
                            }
                        }
                    }
                    if !regexes.is_empty() {
                        compiled.push(CompiledEntry {
                            group: g,
                            category: c,
                            entry: e,
                            regexes,
                        });
                    }
                }
            }
        }

        debug!(
            entries = library.entry_count(),
            matchable = compiled.len(),
            invalid = invalid.len(),
            "Compiled pattern library"
        );

        Self {
            library,
            compiled,
            invalid,
        }
    }

    /// The library being matched against
    #[must_use]
    pub fn library(&self) -> &PatternLibrary {
        &self.library
    }

    /// Give the library back
    #[must_use]
    pub fn into_library(self) -> PatternLibrary {
        self.library
    }

    /// Regexes that were skipped because they did not compile
    #[must_use]
    pub fn invalid_patterns(&self) -> &[InvalidPattern] {
        &self.invalid
    }

    /// Find the first entry with a regex matching the start of `test_name`
    #[must_use]
    pub fn find_match(&self, test_name: &str) -> Option<PatternMatch<'_>> {
        if test_name.is_empty() {
            return None;
        }

        self.compiled.iter().find_map(|compiled| {
            let (index, _) = compiled
                .regexes
                .iter()
                .find(|(_, re)| is_match(re, test_name))?;

            let group = &self.library.groups()[compiled.group];
            let category = &group.categories[compiled.category];
            let entry = &category.entries[compiled.entry];
            Some(PatternMatch {
                test_group: &group.name,
                key_parts: &category.name,
                entry,
                pattern: &entry.regexes[*index],
                pattern_index: *index,
            })
        })
    }
}

fn compile_anchored(pattern: &str) -> Result<Regex, fancy_regex::Error> {
    Regex::new(&format!("^(?:{pattern})"))
}

/// A regex that fails at match time (backtrack limit) counts as a miss
fn is_match(re: &Regex, test_name: &str) -> bool {
    re.is_match(test_name).unwrap_or_else(|err| {
        warn!(
            test = %test_name,
            pattern = %re.as_str(),
            error = %err,
            "Library regex failed while matching; treating as no match"
        );
        false
    })
}
