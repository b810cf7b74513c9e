// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Reading and discovering station log files
//!
//! Stations write UTF-8 on recent software and GBK on older installs, so text
//! is decoded as UTF-8 when valid and as GB18030 (a GBK superset) otherwise.
//! Decoding never fails; malformed GB18030 sequences become U+FFFD.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::LogError;
use crate::segmenter::{ParseOutcome, SegmenterOptions, parse_log};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// File name fragment of station startup logs, which hold no test runs
pub const STARTUP_MARKER: &str = "_startup";

/// Text encoding a log was decoded with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogEncoding {
    Utf8,
    Gb18030,
}

/// Decoded log text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLog {
    /// The text
    pub text: String,
    /// Encoding that was applied
    pub encoding: LogEncoding,
    /// Whether replacement characters were substituted
    pub had_errors: bool,
}

/// Decode raw log bytes
#[must_use]
pub fn decode_log_bytes(bytes: &[u8]) -> DecodedLog {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    if let Some(text) =
        encoding_rs::UTF_8.decode_without_bom_handling_and_without_replacement(bytes)
    {
        return DecodedLog {
            text: text.into_owned(),
            encoding: LogEncoding::Utf8,
            had_errors: false,
        };
    }

    let (text, had_errors) = encoding_rs::GB18030.decode_without_bom_handling(bytes);
    DecodedLog {
        text: text.into_owned(),
        encoding: LogEncoding::Gb18030,
        had_errors,
    }
}

/// Read and decode a log file
///
/// # Errors
///
/// Returns [`LogError::Io`] if the file cannot be read.
pub fn read_log_file(path: &Path) -> Result<DecodedLog, LogError> {
    let bytes = fs::read(path).map_err(|e| LogError::io(path, e))?;
    let decoded = decode_log_bytes(&bytes);

    if decoded.had_errors {
        warn!(path = %path.display(), "Log contained undecodable bytes");
    }
    debug!(
        path = %path.display(),
        bytes = bytes.len(),
        encoding = ?decoded.encoding,
        "Read log file"
    );
    Ok(decoded)
}

/// Read, decode and segment a log file
///
/// # Errors
///
/// Returns [`LogError::Io`] if the file cannot be read. Content problems
/// are reported through the outcome's warnings instead.
pub fn parse_log_file(path: &Path, options: &SegmenterOptions) -> Result<ParseOutcome, LogError> {
    let decoded = read_log_file(path)?;
    Ok(parse_log(&decoded.text, options))
}

/// Find `.log`/`.txt` files under `root`, skipping startup logs
///
/// `root` may itself be a file. Results are sorted by path. Entries that
/// cannot be read while walking are logged and skipped.
///
/// # Errors
///
/// Returns [`LogError::Io`] if `root` does not exist.
pub fn discover_log_files(root: &Path) -> Result<Vec<PathBuf>, LogError> {
    fs::metadata(root).map_err(|e| LogError::io(root, e))?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_file() && is_log_file(entry.path()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    debug!(root = %root.display(), count = files.len(), "Discovered log files");
    Ok(files)
}

fn is_log_file(path: &Path) -> bool {
    let has_log_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("log") || e.eq_ignore_ascii_case("txt"));
    let is_startup = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.contains(STARTUP_MARKER));
    has_log_extension && !is_startup
}
