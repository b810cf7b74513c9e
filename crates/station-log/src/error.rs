// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for station-log

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a whole parse
///
/// Malformed lines and measurements never surface here; they are collected as
/// [`ParseWarning`](crate::segmenter::ParseWarning)s instead.
#[derive(Debug, Error)]
pub enum LogError {
    /// Error reading the log file
    #[error("IO error reading {path}: {source}")]
    Io {
        /// The file that could not be read
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Error encoding or decoding block JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
