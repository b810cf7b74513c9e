// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! station-log: Test station diagnostic log segmentation
//!
//! This library crate turns the flat, line-oriented logs written by a hardware
//! test station into structured blocks: one [`TestItemBlock`] per test
//! execution (with its typed [`SubItem`] measurements) and one
//! [`SystemLevelBlock`] per stretch of station activity between tests.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use station_log::{SegmenterOptions, failed_test_items, parse_log_file};
//!
//! let outcome = parse_log_file(Path::new("station.log"), &SegmenterOptions::default()).unwrap();
//! for item in failed_test_items(&outcome.blocks) {
//!     println!("{} failed in {:?} ms", item.test_name, item.duration_ms);
//! }
//! println!("{} measurements skipped", outcome.stats.sub_items_skipped);
//! ```

pub mod block;
pub mod decode;
pub mod error;
pub mod line;
pub mod measurement;
pub mod segmenter;
pub mod serde_time;
pub mod system;

pub use block::{
    BlockKind, BlockStatus, LogBlock, SystemLevelBlock, TestItemBlock, blocks_from_json,
    blocks_of_kind, blocks_to_json, failed_test_items, filter_blocks, read_blocks_json,
    write_blocks_json,
};
pub use decode::{DecodedLog, LogEncoding, discover_log_files, parse_log_file, read_log_file};
pub use error::LogError;
pub use line::{ClassifiedLine, ParsedLine, classify_line};
pub use measurement::{ExtractError, MeasurementStatus, SubItem, extract_measurement};
pub use segmenter::{
    ParseOutcome, ParseStats, ParseWarning, Segmenter, SegmenterOptions, parse_log,
};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::block::{BlockStatus, LogBlock, TestItemBlock, failed_test_items};
    pub use crate::decode::parse_log_file;
    pub use crate::error::LogError;
    pub use crate::segmenter::{ParseOutcome, SegmenterOptions, parse_log};
}
