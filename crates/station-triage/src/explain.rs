// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Prompt building and the explanation service seam
//!
//! A [`PromptSet`] combines an entry's prompt templates with the evidence
//! from one failed block. Sending it anywhere is up to an [`Explainer`];
//! triage never depends on one being configured.

use serde::{Deserialize, Serialize};

use station_log::{BlockStatus, LogBlock, SubItem};
use station_patterns::PatternEntry;

/// Evidence lines included in a failure-analysis prompt
pub const MAX_PROMPT_LOG_LINES: usize = 40;

/// Prompts for one failed test
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSet {
    /// What the test item checks
    pub explanation: String,
    /// Why it failed and what to do about it
    pub failure_analysis: String,
}

impl PromptSet {
    /// Build prompts for `block`, using `entry`'s templates when it has them
    ///
    /// Entries without curated prompts (and unmatched tests) get prompts
    /// generated from whatever metadata is available.
    #[must_use]
    pub fn build(entry: Option<&PatternEntry>, block: &LogBlock) -> Self {
        let test_name = block.test_name().unwrap_or("unnamed system activity");
        let templates = match entry {
            Some(entry) => entry
                .ai_prompt
                .clone()
                .unwrap_or_else(|| entry.default_ai_prompt()),
            None => PatternEntry {
                test_item: test_name.to_string(),
                ..PatternEntry::default()
            }
            .default_ai_prompt(),
        };

        let mut failure_analysis = templates.failure_analysis;
        failure_analysis.push_str(&format!(
            "\n\nTest: {test_name}\nStatus: {}\n",
            block.status()
        ));
        if let Some(ms) = block.duration_ms() {
            failure_analysis.push_str(&format!("Duration: {ms} ms\n"));
        }

        let failed: Vec<&SubItem> = block
            .as_test_item()
            .map(|item| item.failed_sub_items().collect())
            .unwrap_or_default();
        if !failed.is_empty() {
            failure_analysis.push_str("\nFailed measurements:\n");
            for sub in failed {
                failure_analysis.push_str(&format!(
                    "- {} = {} {} (limits {} .. {}) {}\n",
                    sub.description,
                    sub.result,
                    sub.units,
                    sub.low_limit,
                    sub.high_limit,
                    sub.message
                ));
            }
        }

        let details = block.log_details();
        if !details.is_empty() {
            failure_analysis.push_str("\nFailure log:\n");
            let skip = details.len().saturating_sub(MAX_PROMPT_LOG_LINES);
            for line in &details[skip..] {
                failure_analysis.push_str(line);
                failure_analysis.push('\n');
            }
        }

        Self {
            explanation: templates.explanation,
            failure_analysis,
        }
    }
}

/// Everything an explanation service is given about one failed test
#[derive(Debug, Clone, Copy)]
pub struct ExplainRequest<'a> {
    pub test_name: &'a str,
    pub status: BlockStatus,
    pub duration_ms: Option<f64>,
    pub sub_items: &'a [SubItem],
    pub log_details: &'a [String],
    pub prompts: &'a PromptSet,
}

impl<'a> ExplainRequest<'a> {
    /// Request for `block` with prebuilt prompts
    #[must_use]
    pub fn new(block: &'a LogBlock, prompts: &'a PromptSet) -> Self {
        Self {
            test_name: block.test_name().unwrap_or_default(),
            status: block.status(),
            duration_ms: block.duration_ms(),
            sub_items: block
                .as_test_item()
                .map(|item| item.sub_items.as_slice())
                .unwrap_or_default(),
            log_details: block.log_details(),
            prompts,
        }
    }
}

/// Error returned by an explanation service
#[derive(Debug, thiserror::Error)]
#[error("explanation service failed: {0}")]
pub struct ExplainError(pub String);

/// An external service that turns a failed test into free-text guidance
pub trait Explainer {
    /// Produce guidance for one failed test
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be reached or rejects the
    /// request; triage records the failure and carries on.
    fn explain(&self, request: &ExplainRequest<'_>) -> Result<String, ExplainError>;
}
