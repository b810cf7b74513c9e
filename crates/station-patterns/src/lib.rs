// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! station-patterns: Failure pattern library and classifier
//!
//! A pattern library is a curated JSON document mapping
//! `test group -> key parts -> [entries]`, where each entry carries an ordered
//! list of regexes and triage metadata (owner, risk, root-cause hints).
//! [`PatternMatcher`] classifies a test name against it with first-match-wins
//! semantics, and [`LibraryStore`] registers placeholder entries for unknown
//! names under a file lock so concurrent runs never lose each other's writes.
//!
//! # Example
//!
//! ```no_run
//! use station_patterns::{LibraryStore, PatternMatcher, PlaceholderRequest};
//!
//! let store = LibraryStore::new("patterns.json");
//! let matcher = PatternMatcher::new(store.load().unwrap().library);
//!
//! match matcher.find_match("AUDIO_L2AR_EAR_25000_8KHz_TO_140Hz_MIC1_PORTO_EQ") {
//!     Some(hit) => println!("{} / {}: owner {:?}", hit.test_group, hit.key_parts, hit.entry.owner),
//!     None => {
//!         store
//!             .register_placeholders(&[PlaceholderRequest {
//!                 test_name: "AUDIO_L2AR_EAR_25000_8KHz_TO_140Hz_MIC1_PORTO_EQ".to_string(),
//!                 failure_logs: Vec::new(),
//!             }])
//!             .unwrap();
//!     }
//! }
//! ```

pub mod entry;
pub mod error;
pub mod library;
pub mod matcher;
pub mod serde_utils;
pub mod store;

pub use entry::{
    AiPrompt, AnalysisSuggestion, PENDING, PatternEntry, UNCLASSIFIED, default_regex_for,
};
pub use error::PatternError;
pub use library::{EntryRef, PatternCategory, PatternGroup, PatternLibrary};
pub use matcher::{InvalidPattern, PatternMatch, PatternMatcher};
pub use store::{
    DEFAULT_LOCK_TIMEOUT, LibraryStore, PlaceholderRequest, RegisterOutcome, VersionedLibrary,
    content_version,
};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::entry::PatternEntry;
    pub use crate::error::PatternError;
    pub use crate::library::PatternLibrary;
    pub use crate::matcher::{PatternMatch, PatternMatcher};
    pub use crate::store::{LibraryStore, PlaceholderRequest};
}
