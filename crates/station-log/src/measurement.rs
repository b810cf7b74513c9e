// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! `EvalAndLogResults` measurement extraction
//!
//! A measurement message has the informal shape
//!
//! ```text
//! <rec> <meas> <description...> <low> <high> <result> [units] <recipe ms> <test ms>
//!     <status> [message...] <position> <sampling> <open-limit> <enhanced-limit> <meas-code>
//! ```
//!
//! The bracketed `<...>` position marker is the only unambiguous anchor, so
//! extraction works outward from it:
//!
//! 1. Everything after the marker is exactly four tokens.
//! 2. Everything before it is split at the *last* status token, so a
//!    description that mentions `FAILED` cannot flip the verdict.
//! 3. A tab-separated remainder is split on single tabs, so an empty limit
//!    or unit keeps its column. Otherwise it is matched field by field, and
//!    a positional split from the right is the last fallback.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static POSITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("position marker regex is valid"));

static STATUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\*\s*FAILED\s*\*|PASSED|\*\s*PASSED\s*\*|\*?\s*FAILED\s*\*?)")
        .expect("status token regex is valid")
});

static FIELDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\S+)\s+(\S+)\s+(.*?)\s+(-?\d*\.?\d*)\s+(-?\d*\.?\d*|\s*)\s+(-?\d*\.?\d*)\s*(\S*)\s+(\d+)\s+(\d+)$",
    )
    .expect("measurement fields regex is valid")
});

/// Number of whitespace tokens that must follow the position marker
const TRAILER_TOKENS: usize = 4;

/// Minimum tokens for the positional fallback: two ids, a description word
/// and six trailing fields
const POSITIONAL_MIN_TOKENS: usize = 9;

/// Pass/fail verdict of a single measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementStatus {
    /// `PASSED`
    #[serde(alias = "成功")]
    Pass,
    /// `* FAILED *`
    #[serde(alias = "失败")]
    Fail,
}

impl MeasurementStatus {
    /// Normalize a raw status token
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        if token.contains("PASSED") {
            Self::Pass
        } else {
            Self::Fail
        }
    }
}

/// One measurement reported inside a test item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubItem {
    /// Source line of the `EvalAndLogResults` entry
    pub line_number: usize,
    /// Timestamp of the source line
    #[serde(with = "crate::serde_time", default)]
    pub timestamp: Option<NaiveDateTime>,
    /// Record id (first leading number)
    #[serde(default)]
    pub record_id: String,
    /// Measurement id (second leading number)
    #[serde(default)]
    pub measurement_id: String,
    /// Free-text measurement description
    #[serde(alias = "measure_description")]
    pub description: String,
    /// Lower limit as written (may be empty)
    pub low_limit: String,
    /// Upper limit as written (may be empty)
    pub high_limit: String,
    /// Measured value as written
    pub result: String,
    /// Unit string (may be empty)
    pub units: String,
    /// Recipe time in ms as written
    #[serde(default)]
    pub recipe_time: String,
    /// Test time in ms as written
    #[serde(default)]
    pub test_time: String,
    /// Pass/fail verdict
    pub status: MeasurementStatus,
    /// Optional free text between the status and the position marker
    pub message: String,
    /// Position-in-limits marker, brackets included
    #[serde(default)]
    pub position: String,
    /// Sampling flag
    #[serde(default)]
    pub sampling: String,
    /// Open-limit flag
    #[serde(default)]
    pub open_limit: String,
    /// Enhanced-limit flag
    #[serde(default)]
    pub enhanced_limit: String,
    /// Measurement code
    pub meas_code: String,
}

impl SubItem {
    /// Lower limit as a number
    #[must_use]
    pub fn low_limit_value(&self) -> Option<f64> {
        parse_number(&self.low_limit)
    }

    /// Upper limit as a number
    #[must_use]
    pub fn high_limit_value(&self) -> Option<f64> {
        parse_number(&self.high_limit)
    }

    /// Measured value as a number
    #[must_use]
    pub fn result_value(&self) -> Option<f64> {
        parse_number(&self.result)
    }

    /// Check if the measurement passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == MeasurementStatus::Pass
    }

    /// Check if the measurement failed
    #[must_use]
    pub fn failed(&self) -> bool {
        self.status == MeasurementStatus::Fail
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

/// Why a measurement message could not be extracted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// No `<...>` position marker in the message
    #[error("missing position marker")]
    MissingPositionMarker,

    /// Fewer than four tokens after the position marker
    #[error("expected 4 tokens after position marker, found {found}")]
    TruncatedTrailer {
        /// Tokens actually present
        found: usize,
    },

    /// No status token before the position marker
    #[error("missing PASSED/FAILED status token")]
    MissingStatus,

    /// Neither the field pattern nor the positional fallback applied
    #[error("expected at least 9 fields before status, found {found}")]
    TooFewFields {
        /// Tokens actually present
        found: usize,
    },
}

/// Fields that precede the status token
struct LeadingFields {
    record_id: String,
    measurement_id: String,
    description: String,
    low_limit: String,
    high_limit: String,
    result: String,
    units: String,
    recipe_time: String,
    test_time: String,
}

/// Extract a [`SubItem`] from the message body of an `EvalAndLogResults` line
///
/// # Errors
///
/// Returns an [`ExtractError`] describing the first anchor that was missing.
/// Callers treat every error as non-fatal.
pub fn extract_measurement(
    line_number: usize,
    timestamp: Option<NaiveDateTime>,
    message: &str,
) -> Result<SubItem, ExtractError> {
    let marker = POSITION_RE
        .find(message)
        .ok_or(ExtractError::MissingPositionMarker)?;

    let before_marker = message[..marker.start()].trim();
    let trailer: Vec<&str> = message[marker.end()..].split_whitespace().collect();
    if trailer.len() < TRAILER_TOKENS {
        return Err(ExtractError::TruncatedTrailer {
            found: trailer.len(),
        });
    }

    let status_match = STATUS_RE
        .find_iter(before_marker)
        .last()
        .ok_or(ExtractError::MissingStatus)?;
    let status = MeasurementStatus::from_token(status_match.as_str());
    let before_status = before_marker[..status_match.start()].trim();
    let status_message = before_marker[status_match.end()..].trim();

    let fields = split_tab_fields(before_status)
        .or_else(|| match_fields(before_status))
        .map_or_else(|| split_fields(before_status), Ok)?;

    Ok(SubItem {
        line_number,
        timestamp,
        record_id: fields.record_id,
        measurement_id: fields.measurement_id,
        description: fields.description,
        low_limit: fields.low_limit,
        high_limit: fields.high_limit,
        result: fields.result,
        units: fields.units,
        recipe_time: fields.recipe_time,
        test_time: fields.test_time,
        status,
        message: status_message.to_string(),
        position: marker.as_str().to_string(),
        sampling: trailer[0].to_string(),
        open_limit: trailer[1].to_string(),
        enhanced_limit: trailer[2].to_string(),
        meas_code: trailer[3].to_string(),
    })
}

/// Split on single tabs: two ids, the description, then six fixed columns
fn split_tab_fields(text: &str) -> Option<LeadingFields> {
    if !text.contains('\t') {
        return None;
    }
    let parts: Vec<&str> = text.split('\t').map(str::trim).collect();
    let n = parts.len();
    if n < POSITIONAL_MIN_TOKENS {
        return None;
    }

    Some(LeadingFields {
        record_id: parts[0].to_string(),
        measurement_id: parts[1].to_string(),
        description: parts[2..n - 6].join(" "),
        low_limit: parts[n - 6].to_string(),
        high_limit: parts[n - 5].to_string(),
        result: parts[n - 4].to_string(),
        units: parts[n - 3].to_string(),
        recipe_time: parts[n - 2].to_string(),
        test_time: parts[n - 1].to_string(),
    })
}

fn match_fields(text: &str) -> Option<LeadingFields> {
    let caps = FIELDS_RE.captures(text)?;
    let group = |i: usize| caps.get(i).map_or("", |m| m.as_str()).trim().to_string();

    Some(LeadingFields {
        record_id: group(1),
        measurement_id: group(2),
        description: group(3),
        low_limit: group(4),
        high_limit: group(5),
        result: group(6),
        units: group(7),
        recipe_time: group(8),
        test_time: group(9),
    })
}

/// Positional fallback: the last six tokens are fixed fields, the first two
/// are ids and everything in between is the description
fn split_fields(text: &str) -> Result<LeadingFields, ExtractError> {
    let parts: Vec<&str> = text.split_whitespace().collect();
    let n = parts.len();
    if n < POSITIONAL_MIN_TOKENS {
        return Err(ExtractError::TooFewFields { found: n });
    }

    Ok(LeadingFields {
        record_id: parts[0].to_string(),
        measurement_id: parts[1].to_string(),
        description: parts[2..n - 6].join(" "),
        low_limit: parts[n - 6].to_string(),
        high_limit: parts[n - 5].to_string(),
        result: parts[n - 4].to_string(),
        units: parts[n - 3].to_string(),
        recipe_time: parts[n - 2].to_string(),
        test_time: parts[n - 1].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn extract(message: &str) -> Result<SubItem, ExtractError> {
        extract_measurement(10, None, message)
    }

    #[test]
    fn test_extract_passed_measurement() {
        let msg = "1\t3\tSPL at 1KHz MIC2\t-10.5\t10.5\t2.31\tdB\t120\t118\tPASSED\t\t<----|*---->\t1\tFALSE\tFALSE\tAUD001";
        let item = extract(msg).expect("should extract");

        assert_eq!(item.record_id, "1");
        assert_eq!(item.measurement_id, "3");
        assert_eq!(item.description, "SPL at 1KHz MIC2");
        assert_eq!(item.low_limit, "-10.5");
        assert_eq!(item.high_limit, "10.5");
        assert_eq!(item.result, "2.31");
        assert_eq!(item.units, "dB");
        assert_eq!(item.recipe_time, "120");
        assert_eq!(item.test_time, "118");
        assert_eq!(item.status, MeasurementStatus::Pass);
        assert_eq!(item.message, "");
        assert_eq!(item.position, "<----|*---->");
        assert_eq!(item.sampling, "1");
        assert_eq!(item.open_limit, "FALSE");
        assert_eq!(item.enhanced_limit, "FALSE");
        assert_eq!(item.meas_code, "AUD001");
        assert_eq!(item.low_limit_value(), Some(-10.5));
        assert!(item.passed());
    }

    #[test]
    fn test_extract_failed_with_message() {
        let msg = "2 7 THD ratio 0 5 9.75 % 40 38 * FAILED * above high limit <-------->	1 FALSE TRUE AUD002";
        let item = extract(msg).expect("should extract");

        assert_eq!(item.status, MeasurementStatus::Fail);
        assert_eq!(item.description, "THD ratio");
        assert_eq!(item.result, "9.75");
        assert_eq!(item.units, "%");
        assert_eq!(item.message, "above high limit");
        assert_eq!(item.meas_code, "AUD002");
    }

    #[test]
    fn test_description_containing_failed_does_not_flip_status() {
        let msg = "4 1 FAILED retry counter 0 3 0 cnt 10 9 PASSED <--*--> 1 FALSE FALSE CNT01";
        let item = extract(msg).expect("should extract");

        assert_eq!(item.status, MeasurementStatus::Pass);
        assert_eq!(item.description, "FAILED retry counter");
    }

    #[test]
    fn test_last_status_token_wins_when_failed_is_last() {
        let msg = "4 1 PASSED count check 0 3 7 cnt 10 9 * FAILED * <-----> 1 FALSE FALSE CNT02";
        let item = extract(msg).expect("should extract");
        assert_eq!(item.status, MeasurementStatus::Fail);
        assert_eq!(item.description, "PASSED count check");
    }

    #[test]
    fn test_description_with_embedded_numbers() {
        let msg = "1 2 Gain 5 dB step 1 2 1.5 dB 120 118 PASSED <--*--> 1 FALSE FALSE G01";
        let item = extract(msg).expect("should extract");

        assert_eq!(item.description, "Gain 5 dB step");
        assert_eq!(item.low_limit, "1");
        assert_eq!(item.high_limit, "2");
        assert_eq!(item.result, "1.5");
    }

    #[test]
    fn test_empty_units() {
        let msg = "1\t2\tBattery level\t10\t100\t87\t\t15\t14\tPASSED\t<--*-->\t1\tFALSE\tFALSE\tBAT01";
        let item = extract(msg).expect("should extract");

        assert_eq!(item.description, "Battery level");
        assert_eq!(item.result, "87");
        assert_eq!(item.units, "");
        assert_eq!(item.recipe_time, "15");
    }

    #[test]
    fn test_empty_low_limit_keeps_its_column() {
        let msg = "1\t2\tVbat\t\t4.4\t3.9\tV\t10\t9\tPASSED\t\t<---*-->\t1\tFALSE\tFALSE\tV01";
        let item = extract(msg).expect("should extract");

        assert_eq!(item.description, "Vbat");
        assert_eq!(item.low_limit, "");
        assert_eq!(item.high_limit, "4.4");
        assert_eq!(item.result, "3.9");
        assert_eq!(item.units, "V");
        assert_eq!(item.recipe_time, "10");
        assert_eq!(item.test_time, "9");
        assert_eq!(item.low_limit_value(), None);
        assert_eq!(item.high_limit_value(), Some(4.4));
    }

    #[test]
    fn test_positional_fallback_for_non_numeric_result() {
        let msg = "1 2 Firmware version check v1 v9 v5 ver 15 14 PASSED <--*--> 1 FALSE FALSE FW01";
        let item = extract(msg).expect("fallback should extract");

        assert_eq!(item.record_id, "1");
        assert_eq!(item.measurement_id, "2");
        assert_eq!(item.description, "Firmware version check");
        assert_eq!(item.low_limit, "v1");
        assert_eq!(item.high_limit, "v9");
        assert_eq!(item.result, "v5");
        assert_eq!(item.units, "ver");
        assert_eq!(item.recipe_time, "15");
        assert_eq!(item.test_time, "14");
    }

    #[test]
    fn test_missing_marker() {
        let err = extract("1 2 desc 0 1 0 V 1 1 PASSED 1 FALSE FALSE X").unwrap_err();
        assert_eq!(err, ExtractError::MissingPositionMarker);
    }

    #[test]
    fn test_truncated_trailer() {
        let err = extract("1 2 desc 0 1 0 V 1 1 PASSED <--*--> 1 FALSE").unwrap_err();
        assert_eq!(err, ExtractError::TruncatedTrailer { found: 2 });
    }

    #[test]
    fn test_missing_status() {
        let err = extract("1 2 desc 0 1 0 V 1 1 <--*--> 1 FALSE FALSE X").unwrap_err();
        assert_eq!(err, ExtractError::MissingStatus);
    }

    #[test]
    fn test_too_few_fields() {
        let err = extract("x PASSED <--*--> 1 FALSE FALSE X").unwrap_err();
        assert_eq!(err, ExtractError::TooFewFields { found: 1 });
    }

    #[test]
    fn test_status_variants_normalize() {
        assert_eq!(MeasurementStatus::from_token("PASSED"), MeasurementStatus::Pass);
        assert_eq!(MeasurementStatus::from_token("* PASSED *"), MeasurementStatus::Pass);
        assert_eq!(MeasurementStatus::from_token("* FAILED *"), MeasurementStatus::Fail);
        assert_eq!(MeasurementStatus::from_token("*FAILED*"), MeasurementStatus::Fail);
        assert_eq!(MeasurementStatus::from_token("FAILED"), MeasurementStatus::Fail);
    }
}
