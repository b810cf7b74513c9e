// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Block segmentation
//!
//! The [`Segmenter`] is a line-at-a-time state machine:
//!
//! ```text
//!            Header                      Footer (Overall Result)
//!   Idle ──────────────► InTestItem ───────────────────────► FooterTail(n)
//!    │ ▲                   │   ▲                                │
//!    │ │ END_OF_TEST       │   └ EvalAndLogResults → SubItem    │ n == 0 or END_OF_TEST
//!    │ └───────────────────┘                                    │
//!    │ ◄────────────────────────────────────────────────────────┘
//!    └ other lines → SystemLevel block (closed by the next Header or EOF)
//! ```
//!
//! Malformed lines and measurements never abort segmentation. They are
//! recorded as [`ParseWarning`]s in the returned [`ParseStats`].

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::block::{BlockStatus, LogBlock, SystemLevelBlock, TestItemBlock};
use crate::line::{ClassifiedLine, ParsedLine, classify_line};
use crate::measurement::extract_measurement;
use crate::system::{infer_system_name, infer_system_status};

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Test = (?P<test_name>\S+)\s+\|\s+Barcode = (?P<barcode>\S+)")
        .expect("header banner regex is valid")
});

static FOOTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Test = (?P<test_name>\S+)\s+\|\s+Overall Result = (?P<result_code>.*?)\s+\|\s+Test Time = (?P<duration>[\d.]+) msec",
    )
    .expect("footer regex is valid")
});

/// Lines absorbed after an Overall Result footer unless `END_OF_TEST` comes first
pub const DEFAULT_FOOTER_TAIL_LINES: usize = 2;

/// Segmentation knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmenterOptions {
    /// Infer names and statuses of system-level blocks from their lines
    pub infer_system_names: bool,
    /// Trailing lines that belong to a test item after its result footer
    pub footer_tail_lines: usize,
}

impl Default for SegmenterOptions {
    fn default() -> Self {
        Self {
            infer_system_names: true,
            footer_tail_lines: DEFAULT_FOOTER_TAIL_LINES,
        }
    }
}

/// A non-fatal problem found while segmenting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseWarning {
    /// Line did not match the grammar; kept as opaque content
    UnparsableLine {
        /// Source line number
        line: usize,
    },
    /// An `EvalAndLogResults` line could not be turned into a sub-item
    MeasurementExtractionFailure {
        /// Source line number
        line: usize,
        /// Why extraction failed
        reason: String,
        /// The message body that was rejected
        message: String,
    },
    /// A test item closed without a usable Overall Result footer
    MissingOverallResult {
        /// Header line of the test item
        line: usize,
        /// Name of the test item
        test_name: String,
    },
    /// A new Header arrived while a test item was still open
    HeaderInterruptedTest {
        /// Line of the interrupting Header
        line: usize,
        /// Name of the test item that was closed early
        test_name: String,
    },
}

/// Counts surfaced to callers after a parse
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    /// Every input line, blank ones included
    pub total_lines: usize,
    /// Whitespace-only lines (skipped)
    pub blank_lines: usize,
    /// Lines matching the grammar
    pub parsed_lines: usize,
    /// Lines kept as opaque content
    pub unparsable_lines: usize,
    /// Measurements turned into sub-items
    pub sub_items_parsed: usize,
    /// Measurements that could not be extracted
    pub sub_items_skipped: usize,
    /// Test-item blocks emitted
    pub test_items: usize,
    /// System-level blocks emitted
    pub system_blocks: usize,
    /// Test items with a failing overall result
    pub failed_test_items: usize,
    /// Non-fatal problems, in source order
    pub warnings: Vec<ParseWarning>,
}

impl ParseStats {
    /// Check if any measurement or footer was lost
    #[must_use]
    pub fn has_skipped_content(&self) -> bool {
        self.sub_items_skipped > 0
            || self
                .warnings
                .iter()
                .any(|w| matches!(w, ParseWarning::MissingOverallResult { .. }))
    }
}

/// Blocks and statistics from one parse
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseOutcome {
    /// Blocks in source order
    pub blocks: Vec<LogBlock>,
    /// Counts and warnings
    pub stats: ParseStats,
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    System(SystemLevelBlock),
    InTestItem(TestItemBlock),
    FooterTail(TestItemBlock, usize),
}

/// Line-at-a-time block segmenter
#[derive(Debug)]
pub struct Segmenter {
    options: SegmenterOptions,
    state: State,
    blocks: Vec<LogBlock>,
    stats: ParseStats,
}

impl Segmenter {
    /// Create a segmenter with the given options
    #[must_use]
    pub fn new(options: SegmenterOptions) -> Self {
        Self {
            options,
            state: State::Idle,
            blocks: Vec::new(),
            stats: ParseStats::default(),
        }
    }

    /// Feed one raw line (without its terminator)
    pub fn process_line(&mut self, line_number: usize, raw: &str) {
        self.stats.total_lines += 1;
        if raw.trim().is_empty() {
            self.stats.blank_lines += 1;
            return;
        }

        let line = classify_line(line_number, raw);
        match line.parsed() {
            Some(parsed) if parsed.is_header() => {
                let parsed = parsed.clone();
                self.stats.parsed_lines += 1;
                self.open_test_item(parsed);
                return;
            }
            Some(_) => self.stats.parsed_lines += 1,
            None => {
                self.stats.unparsable_lines += 1;
                self.stats
                    .warnings
                    .push(ParseWarning::UnparsableLine { line: line_number });
            }
        }

        self.state = match std::mem::take(&mut self.state) {
            State::Idle => State::System(start_system_block(&line)),
            State::System(mut block) => {
                consume_system(&mut block, &line);
                State::System(block)
            }
            State::InTestItem(item) => self.advance_test_item(item, &line),
            State::FooterTail(mut item, remaining) => {
                consume_test(&mut item, &line);
                let remaining = remaining.saturating_sub(1);
                let end_of_test = line.parsed().is_some_and(ParsedLine::is_end_of_test);
                if end_of_test || remaining == 0 {
                    self.close_test_item(item);
                    State::Idle
                } else {
                    State::FooterTail(item, remaining)
                }
            }
        };
    }

    /// Close any open block and return everything collected
    #[must_use]
    pub fn finish(mut self) -> ParseOutcome {
        match std::mem::take(&mut self.state) {
            State::Idle => {}
            State::System(block) => self.close_system_block(block),
            State::InTestItem(item) | State::FooterTail(item, _) => self.close_test_item(item),
        }

        debug!(
            blocks = self.blocks.len(),
            test_items = self.stats.test_items,
            system_blocks = self.stats.system_blocks,
            skipped = self.stats.sub_items_skipped,
            "Segmentation finished"
        );

        ParseOutcome {
            blocks: self.blocks,
            stats: self.stats,
        }
    }

    fn open_test_item(&mut self, header: ParsedLine) {
        match std::mem::take(&mut self.state) {
            State::Idle => {}
            State::System(block) => self.close_system_block(block),
            State::FooterTail(item, _) => self.close_test_item(item),
            State::InTestItem(item) => {
                warn!(
                    line = header.line_number,
                    test = %item.test_name,
                    "Header arrived before the open test item ended; closing it"
                );
                self.stats.warnings.push(ParseWarning::HeaderInterruptedTest {
                    line: header.line_number,
                    test_name: item.test_name.clone(),
                });
                self.close_test_item(item);
            }
        }

        let (test_name, barcode) = match HEADER_RE.captures(&header.message) {
            Some(caps) => (caps["test_name"].to_string(), Some(caps["barcode"].to_string())),
            None => (header.context.clone(), None),
        };

        self.state = State::InTestItem(TestItemBlock {
            test_name,
            barcode,
            status: BlockStatus::Unknown,
            start_time: header.timestamp,
            start_line: header.line_number,
            end_time: header.timestamp,
            end_line: header.line_number,
            duration_ms: None,
            sub_items: Vec::new(),
            log_details: vec![header.raw],
        });
    }

    fn advance_test_item(&mut self, mut item: TestItemBlock, line: &ClassifiedLine) -> State {
        consume_test(&mut item, line);
        let Some(parsed) = line.parsed() else {
            return State::InTestItem(item);
        };

        if parsed.is_measurement() {
            self.extract_sub_item(&mut item, parsed);
            State::InTestItem(item)
        } else if parsed.is_result_footer() {
            apply_footer(&mut item, parsed);
            if self.options.footer_tail_lines == 0 {
                self.close_test_item(item);
                State::Idle
            } else {
                State::FooterTail(item, self.options.footer_tail_lines)
            }
        } else if parsed.is_end_of_test() {
            self.close_test_item(item);
            State::Idle
        } else {
            State::InTestItem(item)
        }
    }

    fn extract_sub_item(&mut self, item: &mut TestItemBlock, parsed: &ParsedLine) {
        match extract_measurement(parsed.line_number, parsed.timestamp, &parsed.message) {
            Ok(sub_item) => {
                self.stats.sub_items_parsed += 1;
                item.sub_items.push(sub_item);
            }
            Err(e) => {
                warn!(
                    line = parsed.line_number,
                    message = %parsed.message,
                    error = %e,
                    "Skipping measurement that could not be extracted"
                );
                self.stats.sub_items_skipped += 1;
                self.stats
                    .warnings
                    .push(ParseWarning::MeasurementExtractionFailure {
                        line: parsed.line_number,
                        reason: e.to_string(),
                        message: parsed.message.clone(),
                    });
            }
        }
    }

    fn close_test_item(&mut self, item: TestItemBlock) {
        if item.status == BlockStatus::Unknown {
            self.stats.warnings.push(ParseWarning::MissingOverallResult {
                line: item.start_line,
                test_name: item.test_name.clone(),
            });
        }
        if item.status == BlockStatus::Fail {
            self.stats.failed_test_items += 1;
        }
        self.stats.test_items += 1;
        self.blocks.push(LogBlock::TestItem(item));
    }

    fn close_system_block(&mut self, mut block: SystemLevelBlock) {
        block.duration_ms = duration_between(block.start_time, block.end_time);
        if self.options.infer_system_names {
            block.test_name = infer_system_name(&block.log_details);
            block.status = infer_system_status(&block.log_details);
        }
        self.stats.system_blocks += 1;
        self.blocks.push(LogBlock::SystemLevel(block));
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(SegmenterOptions::default())
    }
}

fn start_system_block(line: &ClassifiedLine) -> SystemLevelBlock {
    SystemLevelBlock {
        test_name: None,
        status: BlockStatus::Unknown,
        start_time: line.timestamp(),
        start_line: line.line_number(),
        end_time: line.timestamp(),
        end_line: line.line_number(),
        duration_ms: None,
        log_details: vec![line.raw().to_string()],
    }
}

fn consume_system(block: &mut SystemLevelBlock, line: &ClassifiedLine) {
    block.log_details.push(line.raw().to_string());
    block.end_line = line.line_number();
    if let Some(ts) = line.timestamp() {
        block.end_time = Some(ts);
    }
}

fn consume_test(item: &mut TestItemBlock, line: &ClassifiedLine) {
    item.log_details.push(line.raw().to_string());
    item.end_line = line.line_number();
    if let Some(ts) = line.timestamp() {
        item.end_time = Some(ts);
    }
}

fn apply_footer(item: &mut TestItemBlock, footer: &ParsedLine) {
    let Some(caps) = FOOTER_RE.captures(&footer.message) else {
        warn!(
            line = footer.line_number,
            test = %item.test_name,
            "Overall Result footer did not match the expected layout"
        );
        return;
    };

    item.status = if caps["result_code"].trim() == "0" {
        BlockStatus::Pass
    } else {
        BlockStatus::Fail
    };
    item.duration_ms = caps["duration"].parse::<f64>().ok();
}

#[allow(clippy::cast_precision_loss)]
fn duration_between(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Option<f64> {
    let (start, end) = (start?, end?);
    Some((end - start).num_milliseconds() as f64)
}

/// Segment a whole log held in memory
#[must_use]
pub fn parse_log(content: &str, options: &SegmenterOptions) -> ParseOutcome {
    let mut segmenter = Segmenter::new(*options);
    for (index, raw) in content.lines().enumerate() {
        segmenter.process_line(index + 1, raw);
    }
    segmenter.finish()
}
