// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Classification of failed blocks against the pattern library
//!
//! Every failed test item, and every failed system block with an inferred
//! name, becomes one [`TriageRecord`]. A missing or broken library never
//! drops a failure: the records are still produced, marked
//! [`Classification::Uncategorized`].
//!
//! # Example
//!
//! ```no_run
//! use station_log::{SegmenterOptions, parse_log_file};
//! use station_patterns::LibraryStore;
//! use station_triage::triage::{TriageOptions, Triager};
//!
//! let outcome = parse_log_file("station.log".as_ref(), &SegmenterOptions::default()).unwrap();
//! let mut triager = Triager::open(LibraryStore::new("patterns.json"), TriageOptions::default());
//! let report = triager.triage(&outcome.blocks);
//! println!("{} matched, {} unmatched", report.matched_count(), report.unmatched_count());
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use station_log::{
    BlockKind, BlockStatus, LogBlock, LogError, ParseStats, SegmenterOptions, parse_log_file,
};
use station_patterns::{
    LibraryStore, PatternLibrary, PatternMatch, PatternMatcher, PlaceholderRequest,
};

use crate::db::{Database, DbError};
use crate::explain::{ExplainRequest, Explainer, PromptSet};

// ============================================================================
// Error Types
// ============================================================================

/// Errors from triaging a log file
#[derive(Debug, Error)]
pub enum TriageError {
    /// The log could not be read
    #[error("Log error: {0}")]
    Log(#[from] LogError),

    /// The run could not be recorded
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

// ============================================================================
// Report Types
// ============================================================================

/// Whether classification had a library to work with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LibraryStatus {
    /// Library loaded and compiled
    Loaded {
        /// Where it came from, if it was read from a file
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
        /// Content version, if it was read from a file
        #[serde(skip_serializing_if = "Option::is_none")]
        version: Option<String>,
        entries: usize,
        /// Regexes skipped because they did not compile
        invalid_patterns: usize,
    },
    /// No usable library; failures are reported uncategorized
    Unavailable {
        /// Why the library could not be used
        reason: String,
    },
}

impl LibraryStatus {
    /// Check if a library is available
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

/// Metadata copied from the matched library entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedEntry {
    pub test_group: String,
    pub key_parts: String,
    /// Template name of the entry
    pub template: String,
    /// The regex that matched
    pub pattern: String,
    pub pattern_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub possible_causes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub solutions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prevention: Vec<String>,
    /// The entry is a placeholder still awaiting curation
    pub pending: bool,
}

impl From<&PatternMatch<'_>> for MatchedEntry {
    fn from(hit: &PatternMatch<'_>) -> Self {
        let entry = hit.entry;
        let analysis = entry.analysis_suggest.clone().unwrap_or_default();
        Self {
            test_group: hit.test_group.to_string(),
            key_parts: hit.key_parts.to_string(),
            template: entry.test_item.clone(),
            pattern: hit.pattern.to_string(),
            pattern_index: hit.pattern_index,
            owner: entry.owner.clone(),
            risk: entry.risk.clone(),
            impact: entry.impact.clone(),
            method: entry.method.clone(),
            possible_causes: analysis.possible_causes,
            solutions: analysis.solutions,
            prevention: analysis.prevention,
            pending: entry.is_pending(),
        }
    }
}

/// How one failed test was classified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Classification {
    /// A library entry matched
    Matched(MatchedEntry),
    /// No entry matched
    Unmatched {
        /// A placeholder entry was added to the library for this name
        registered: bool,
    },
    /// No library was available
    Uncategorized,
}

/// One failed test and its classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageRecord {
    pub test_name: String,
    pub block_kind: String,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    /// Descriptions of the failing measurements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_measurements: Vec<String>,
    pub classification: Classification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<PromptSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl TriageRecord {
    /// Check if a library entry matched this test
    #[must_use]
    pub fn is_matched(&self) -> bool {
        matches!(self.classification, Classification::Matched(_))
    }

    /// The matched entry, if any
    #[must_use]
    pub fn matched(&self) -> Option<&MatchedEntry> {
        match &self.classification {
            Classification::Matched(m) => Some(m),
            _ => None,
        }
    }
}

/// Result of triaging the blocks of one log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageReport {
    pub library: LibraryStatus,
    /// Failed tests in block order
    pub records: Vec<TriageRecord>,
    /// Names that received placeholder entries during this triage
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub registered: Vec<String>,
    /// Placeholder registration failed; the records are still complete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_error: Option<String>,
}

impl TriageReport {
    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_matched()).count()
    }

    #[must_use]
    pub fn unmatched_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.classification, Classification::Unmatched { .. }))
            .count()
    }

    /// Records that found no library entry, for whatever reason
    pub fn unclassified(&self) -> impl Iterator<Item = &TriageRecord> {
        self.records.iter().filter(|r| !r.is_matched())
    }
}

// ============================================================================
// Triager
// ============================================================================

/// Triage behavior switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriageOptions {
    /// Add placeholder entries for unmatched names (needs a library store)
    pub register_unmatched: bool,
    /// Attach a [`PromptSet`] to each record
    pub build_prompts: bool,
}

impl Default for TriageOptions {
    fn default() -> Self {
        Self {
            register_unmatched: true,
            build_prompts: false,
        }
    }
}

/// Classifies failed blocks, registering unknown names in the library
pub struct Triager {
    matcher: Option<PatternMatcher>,
    status: LibraryStatus,
    store: Option<LibraryStore>,
    options: TriageOptions,
    explainer: Option<Box<dyn Explainer>>,
}

impl Triager {
    /// Triage against the library in `store`
    ///
    /// A library that cannot be loaded is reported as
    /// [`LibraryStatus::Unavailable`] rather than as an error.
    #[must_use]
    pub fn open(store: LibraryStore, options: TriageOptions) -> Self {
        let mut triager = Self {
            matcher: None,
            status: LibraryStatus::Unavailable {
                reason: "not loaded".to_string(),
            },
            store: Some(store),
            options,
            explainer: None,
        };
        triager.reload();
        triager
    }

    /// Triage against an in-memory library; nothing is registered
    #[must_use]
    pub fn with_library(library: PatternLibrary, options: TriageOptions) -> Self {
        let matcher = PatternMatcher::new(library);
        Self {
            status: loaded_status(&matcher, None, None),
            matcher: Some(matcher),
            store: None,
            options,
            explainer: None,
        }
    }

    /// Ask `explainer` for guidance on every failed test
    #[must_use]
    pub fn with_explainer(mut self, explainer: Box<dyn Explainer>) -> Self {
        self.explainer = Some(explainer);
        self
    }

    /// Current library state
    #[must_use]
    pub fn library_status(&self) -> &LibraryStatus {
        &self.status
    }

    fn reload(&mut self) {
        let Some(store) = &self.store else {
            return;
        };
        match store.load() {
            Ok(versioned) => {
                let matcher = PatternMatcher::new(versioned.library);
                self.status = loaded_status(
                    &matcher,
                    Some(store.path().to_path_buf()),
                    Some(versioned.version),
                );
                self.matcher = Some(matcher);
            }
            Err(e) => {
                warn!(
                    path = %store.path().display(),
                    error = %e,
                    "Pattern library unavailable; failures will be reported uncategorized"
                );
                self.status = LibraryStatus::Unavailable {
                    reason: e.to_string(),
                };
                self.matcher = None;
            }
        }
    }

    /// Classify every failed block
    ///
    /// Unmatched names are registered as placeholders when enabled, and the
    /// library is reloaded so later calls classify them.
    pub fn triage(&mut self, blocks: &[LogBlock]) -> TriageReport {
        let mut records = Vec::new();
        let mut requests = Vec::new();

        for block in blocks.iter().filter(|b| is_triage_candidate(b)) {
            let test_name = block.test_name().unwrap_or_default();
            let hit = self.matcher.as_ref().and_then(|m| m.find_match(test_name));

            let classification = match (&self.matcher, &hit) {
                (None, _) => Classification::Uncategorized,
                (Some(_), Some(hit)) => Classification::Matched(MatchedEntry::from(hit)),
                (Some(_), None) => {
                    requests.push(PlaceholderRequest {
                        test_name: test_name.to_string(),
                        failure_logs: block.log_details().to_vec(),
                    });
                    Classification::Unmatched { registered: false }
                }
            };

            let prompts = (self.options.build_prompts || self.explainer.is_some())
                .then(|| PromptSet::build(hit.as_ref().map(|h| h.entry), block));
            let explanation = match (&self.explainer, &prompts) {
                (Some(explainer), Some(prompts)) => {
                    explain(explainer.as_ref(), &ExplainRequest::new(block, prompts))
                }
                _ => None,
            };

            records.push(TriageRecord {
                test_name: test_name.to_string(),
                block_kind: kind_label(block.kind()).to_string(),
                start_line: block.start_line(),
                end_line: block.end_line(),
                duration_ms: block.duration_ms(),
                failed_measurements: failed_measurements(block),
                classification,
                prompts: prompts.filter(|_| self.options.build_prompts),
                explanation,
            });
        }

        let mut report = TriageReport {
            library: self.status.clone(),
            records,
            registered: Vec::new(),
            registration_error: None,
        };
        self.register(&requests, &mut report);

        debug!(
            failed = report.records.len(),
            matched = report.matched_count(),
            unmatched = report.unmatched_count(),
            "Triage complete"
        );
        report
    }

    fn register(&mut self, requests: &[PlaceholderRequest], report: &mut TriageReport) {
        if requests.is_empty() || !self.options.register_unmatched {
            return;
        }
        let Some(store) = &self.store else {
            return;
        };

        match store.register_placeholders(requests) {
            Ok(outcome) => {
                for record in &mut report.records {
                    if let Classification::Unmatched { registered } = &mut record.classification {
                        *registered = outcome.added.contains(&record.test_name);
                    }
                }
                if !outcome.added.is_empty() {
                    info!(count = outcome.added.len(), "Registered unmatched tests for curation");
                    report.registered = outcome.added;
                    self.reload();
                }
            }
            Err(e) => {
                warn!(error = %e, "Could not register unmatched tests");
                report.registration_error = Some(e.to_string());
            }
        }
    }
}

fn loaded_status(
    matcher: &PatternMatcher,
    path: Option<PathBuf>,
    version: Option<String>,
) -> LibraryStatus {
    LibraryStatus::Loaded {
        path,
        version,
        entries: matcher.library().entry_count(),
        invalid_patterns: matcher.invalid_patterns().len(),
    }
}

fn explain(explainer: &dyn Explainer, request: &ExplainRequest<'_>) -> Option<String> {
    match explainer.explain(request) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(test = %request.test_name, error = %e, "Explanation unavailable");
            None
        }
    }
}

/// Failed test items, and failed system blocks that have a name
fn is_triage_candidate(block: &LogBlock) -> bool {
    block.status() == BlockStatus::Fail
        && block.test_name().is_some_and(|name| !name.trim().is_empty())
}

fn kind_label(kind: BlockKind) -> &'static str {
    match kind {
        BlockKind::TestItem => "TestItem",
        BlockKind::SystemLevel => "SystemLevel",
    }
}

fn failed_measurements(block: &LogBlock) -> Vec<String> {
    block
        .as_test_item()
        .map(|item| {
            item.failed_sub_items()
                .map(|sub| {
                    format!("{} = {} {}", sub.description, sub.result, sub.units)
                        .trim_end()
                        .to_string()
                })
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// File Pipeline
// ============================================================================

/// Triage result for one log file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileTriage {
    pub source: PathBuf,
    /// History run id, when the run was recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub stats: ParseStats,
    pub report: TriageReport,
}

/// Parse, triage and optionally record one log file
///
/// # Errors
///
/// Returns an error if the file cannot be read or the run cannot be recorded.
pub fn triage_file(
    path: &Path,
    segmenter: &SegmenterOptions,
    triager: &mut Triager,
    history: Option<&mut Database>,
) -> Result<FileTriage, TriageError> {
    info!(path = %path.display(), "Triaging log");

    let outcome = parse_log_file(path, segmenter)?;
    let report = triager.triage(&outcome.blocks);

    let run_id = match history {
        Some(db) => Some(db.record_run(&path.display().to_string(), &outcome, &report)?),
        None => None,
    };

    info!(
        path = %path.display(),
        failed = report.records.len(),
        matched = report.matched_count(),
        unmatched = report.unmatched_count(),
        "Log triaged"
    );

    Ok(FileTriage {
        source: path.to_path_buf(),
        run_id,
        stats: outcome.stats,
        report,
    })
}
