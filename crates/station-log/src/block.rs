// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Block types produced by the segmenter
//!
//! A parsed log is an ordered list of [`LogBlock`]s. Each block is either a
//! [`TestItemBlock`] (one test execution, Header to Footer) or a
//! [`SystemLevelBlock`] (station activity between test executions).
//!
//! JSON output uses English labels. The legacy Chinese labels written by
//! older station tooling are accepted on input.

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::LogError;
use crate::measurement::SubItem;

/// Outcome of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStatus {
    /// No verdict was observed
    #[default]
    #[serde(alias = "未知")]
    Unknown,
    /// Overall result code `0`, or a `PASSED` measurement
    #[serde(alias = "成功")]
    Pass,
    /// Any other overall result code, or a `* FAILED *` measurement
    #[serde(alias = "失败")]
    Fail,
}

impl BlockStatus {
    /// Label used in JSON output
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }
}

impl std::fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One test execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestItemBlock {
    /// Name from the Header banner, else the Header's context field
    pub test_name: String,
    /// Unit barcode from the Header banner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    /// Verdict from the Overall Result footer
    #[serde(default)]
    pub status: BlockStatus,
    /// Timestamp of the Header line
    #[serde(with = "crate::serde_time", default)]
    pub start_time: Option<NaiveDateTime>,
    /// Line number of the Header
    pub start_line: usize,
    /// Timestamp of the last parsed line consumed
    #[serde(with = "crate::serde_time", default)]
    pub end_time: Option<NaiveDateTime>,
    /// Line number of the last line consumed
    pub end_line: usize,
    /// `Test Time` reported by the footer
    #[serde(default)]
    pub duration_ms: Option<f64>,
    /// Measurements in source order
    #[serde(default)]
    pub sub_items: Vec<SubItem>,
    /// Every consumed line, verbatim
    #[serde(default)]
    pub log_details: Vec<String>,
}

impl TestItemBlock {
    /// Measurements that failed
    pub fn failed_sub_items(&self) -> impl Iterator<Item = &SubItem> {
        self.sub_items.iter().filter(|s| s.failed())
    }
}

/// Station activity between test executions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemLevelBlock {
    /// Inferred operation name, if any
    #[serde(default)]
    pub test_name: Option<String>,
    /// Inferred status
    #[serde(default)]
    pub status: BlockStatus,
    /// Timestamp of the first line
    #[serde(with = "crate::serde_time", default)]
    pub start_time: Option<NaiveDateTime>,
    /// Line number of the first line
    pub start_line: usize,
    /// Timestamp of the last parsed line
    #[serde(with = "crate::serde_time", default)]
    pub end_time: Option<NaiveDateTime>,
    /// Line number of the last line
    pub end_line: usize,
    /// `end_time - start_time`, unset when either is missing
    #[serde(default)]
    pub duration_ms: Option<f64>,
    /// Every consumed line, verbatim
    #[serde(default)]
    pub log_details: Vec<String>,
}

/// Discriminant of a [`LogBlock`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// [`LogBlock::TestItem`]
    TestItem,
    /// [`LogBlock::SystemLevel`]
    SystemLevel,
}

/// A segment of a parsed log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "log_type")]
pub enum LogBlock {
    /// A test execution
    #[serde(rename = "TestItem", alias = "测试项")]
    TestItem(TestItemBlock),
    /// System activity
    #[serde(rename = "SystemLevel", alias = "系统级")]
    SystemLevel(SystemLevelBlock),
}

impl LogBlock {
    /// Which variant this is
    #[must_use]
    pub fn kind(&self) -> BlockKind {
        match self {
            Self::TestItem(_) => BlockKind::TestItem,
            Self::SystemLevel(_) => BlockKind::SystemLevel,
        }
    }

    /// Test name (inferred for system blocks)
    #[must_use]
    pub fn test_name(&self) -> Option<&str> {
        match self {
            Self::TestItem(b) => Some(&b.test_name),
            Self::SystemLevel(b) => b.test_name.as_deref(),
        }
    }

    #[must_use]
    pub fn status(&self) -> BlockStatus {
        match self {
            Self::TestItem(b) => b.status,
            Self::SystemLevel(b) => b.status,
        }
    }

    #[must_use]
    pub fn start_line(&self) -> usize {
        match self {
            Self::TestItem(b) => b.start_line,
            Self::SystemLevel(b) => b.start_line,
        }
    }

    #[must_use]
    pub fn end_line(&self) -> usize {
        match self {
            Self::TestItem(b) => b.end_line,
            Self::SystemLevel(b) => b.end_line,
        }
    }

    #[must_use]
    pub fn duration_ms(&self) -> Option<f64> {
        match self {
            Self::TestItem(b) => b.duration_ms,
            Self::SystemLevel(b) => b.duration_ms,
        }
    }

    /// Raw lines owned by the block
    #[must_use]
    pub fn log_details(&self) -> &[String] {
        match self {
            Self::TestItem(b) => &b.log_details,
            Self::SystemLevel(b) => &b.log_details,
        }
    }

    /// The test-item payload, if this is one
    #[must_use]
    pub fn as_test_item(&self) -> Option<&TestItemBlock> {
        match self {
            Self::TestItem(b) => Some(b),
            Self::SystemLevel(_) => None,
        }
    }

    /// The system-level payload, if this is one
    #[must_use]
    pub fn as_system_level(&self) -> Option<&SystemLevelBlock> {
        match self {
            Self::SystemLevel(b) => Some(b),
            Self::TestItem(_) => None,
        }
    }

    /// Check if the block reports a failure
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status() == BlockStatus::Fail
    }
}

// ============================================================================
// Filtering
// ============================================================================

/// Blocks of one kind, optionally restricted to one status
///
/// With `status == None` every block of the kind is kept, including ones
/// whose status is unknown.
pub fn filter_blocks(
    blocks: &[LogBlock],
    kind: BlockKind,
    status: Option<BlockStatus>,
) -> impl Iterator<Item = &LogBlock> {
    blocks
        .iter()
        .filter(move |b| b.kind() == kind && status.is_none_or(|s| b.status() == s))
}

/// Blocks of one kind
pub fn blocks_of_kind(blocks: &[LogBlock], kind: BlockKind) -> impl Iterator<Item = &LogBlock> {
    filter_blocks(blocks, kind, None)
}

/// Test items whose overall result was a failure
pub fn failed_test_items(blocks: &[LogBlock]) -> impl Iterator<Item = &TestItemBlock> {
    filter_blocks(blocks, BlockKind::TestItem, Some(BlockStatus::Fail))
        .filter_map(LogBlock::as_test_item)
}

// ============================================================================
// JSON files
// ============================================================================

/// Serialize blocks as a pretty-printed JSON array
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn blocks_to_json(blocks: &[LogBlock]) -> Result<String, LogError> {
    Ok(serde_json::to_string_pretty(blocks)?)
}

/// Parse a JSON array of blocks
///
/// # Errors
///
/// Returns an error if the text is not a valid block array.
pub fn blocks_from_json(json: &str) -> Result<Vec<LogBlock>, LogError> {
    Ok(serde_json::from_str(json)?)
}

/// Write blocks to a JSON file
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_blocks_json(path: &Path, blocks: &[LogBlock]) -> Result<(), LogError> {
    let json = blocks_to_json(blocks)?;
    let mut file = fs::File::create(path).map_err(|e| LogError::io(path, e))?;
    file.write_all(json.as_bytes())
        .map_err(|e| LogError::io(path, e))?;
    Ok(())
}

/// Read blocks from a JSON file written by this crate or by legacy tooling
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_blocks_json(path: &Path) -> Result<Vec<LogBlock>, LogError> {
    let json = fs::read_to_string(path).map_err(|e| LogError::io(path, e))?;
    blocks_from_json(&json)
}
