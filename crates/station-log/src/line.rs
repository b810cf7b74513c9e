// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Line classification
//!
//! Every station log line is matched against one fixed grammar:
//!
//! ```text
//! <YYYY-MM-DD HH:MM:SS,mmm> [] <LEVEL> <module...> <HH:MM:SS.ffffff> <context> <keyword> <message>
//! ```
//!
//! Lines that do not fit are kept verbatim as [`ClassifiedLine::Unparsable`]
//! so the segmenter can treat them as continuation content. Classification is
//! total: no input makes it fail.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Timestamp layout used by the station, e.g. `2025-09-15 13:09:57,123`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<timestamp>\d{4}-\d{2}-\d{2}\s\d{2}:\d{2}:\d{2},\d{3})\s+\[\]\s+(?P<level>\w+)\s+(?P<module>.+?)\s+(?P<secondary>\d{2}:\d{2}:\d{2}\.\d+)\s+(?P<context>\S+?)\s+(?P<keyword>\S+?)\s+(?P<message>.*)$",
    )
    .expect("line grammar regex is valid")
});

/// Keyword carried by Header lines
pub const KEYWORD_HEADER: &str = "Header";
/// Keyword carried by Footer lines
pub const KEYWORD_FOOTER: &str = "Footer";
/// Keyword carried by measurement lines
pub const KEYWORD_EVAL: &str = "EvalAndLogResults";
/// Context marking the end of a test execution
pub const CONTEXT_END_OF_TEST: &str = "END_OF_TEST";

/// A line that matched the station grammar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedLine {
    /// 1-based line number in the source file
    pub line_number: usize,
    /// Primary timestamp; `None` when the digits form no valid date
    pub timestamp: Option<NaiveDateTime>,
    /// Timestamp text exactly as it appeared
    pub timestamp_raw: String,
    /// Log level (`INFO`, `ERROR`, ...)
    pub level: String,
    /// Emitting module, may contain spaces
    pub module: String,
    /// Secondary timer (`HH:MM:SS.ffffff`)
    pub secondary_time: String,
    /// Context tag (test name, `END_OF_TEST`, ...)
    pub context: String,
    /// Keyword (`Header`, `Footer`, `EvalAndLogResults`, ...)
    pub keyword: String,
    /// Free-form message body
    pub message: String,
    /// The full original line
    pub raw: String,
}

impl ParsedLine {
    /// Header line carrying a `====` banner
    #[must_use]
    pub fn is_header(&self) -> bool {
        self.keyword == KEYWORD_HEADER && self.message.contains("====")
    }

    /// Footer line carrying the overall result
    #[must_use]
    pub fn is_result_footer(&self) -> bool {
        self.keyword == KEYWORD_FOOTER && self.message.contains("Overall Result")
    }

    /// Measurement line
    #[must_use]
    pub fn is_measurement(&self) -> bool {
        self.keyword == KEYWORD_EVAL
    }

    /// End-of-test marker
    #[must_use]
    pub fn is_end_of_test(&self) -> bool {
        self.context == CONTEXT_END_OF_TEST
    }
}

/// Result of classifying one raw line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedLine {
    /// The line matched the grammar
    Parsed(ParsedLine),
    /// Opaque continuation content
    Unparsable {
        /// 1-based line number in the source file
        line_number: usize,
        /// The full original line
        raw: String,
    },
}

impl ClassifiedLine {
    /// 1-based line number
    #[must_use]
    pub fn line_number(&self) -> usize {
        match self {
            Self::Parsed(p) => p.line_number,
            Self::Unparsable { line_number, .. } => *line_number,
        }
    }

    /// The original text of the line
    #[must_use]
    pub fn raw(&self) -> &str {
        match self {
            Self::Parsed(p) => &p.raw,
            Self::Unparsable { raw, .. } => raw,
        }
    }

    /// The parsed fields, if the line matched
    #[must_use]
    pub fn parsed(&self) -> Option<&ParsedLine> {
        match self {
            Self::Parsed(p) => Some(p),
            Self::Unparsable { .. } => None,
        }
    }

    /// Timestamp of a parsed line
    #[must_use]
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.parsed().and_then(|p| p.timestamp)
    }
}

/// Parse a station timestamp such as `2025-09-15 13:09:57,123`
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).ok()
}

/// Format a timestamp the way the station writes it
#[must_use]
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Classify a single raw line
#[must_use]
pub fn classify_line(line_number: usize, raw: &str) -> ClassifiedLine {
    let Some(caps) = LINE_RE.captures(raw) else {
        return ClassifiedLine::Unparsable {
            line_number,
            raw: raw.to_string(),
        };
    };

    let field = |name: &str| caps.name(name).map_or("", |m| m.as_str()).to_string();
    let timestamp_raw = field("timestamp");

    ClassifiedLine::Parsed(ParsedLine {
        line_number,
        timestamp: parse_timestamp(&timestamp_raw),
        timestamp_raw,
        level: field("level"),
        module: field("module"),
        secondary_time: field("secondary"),
        context: field("context"),
        keyword: field("keyword"),
        message: field("message"),
        raw: raw.to_string(),
    })
}
