// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for station-patterns

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur loading, matching against or updating a library
#[derive(Debug, Error)]
pub enum PatternError {
    /// Error reading or writing a library file
    #[error("IO error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Library file does not exist
    #[error("pattern library not found: {0}")]
    LibraryNotFound(PathBuf),

    /// Library text is not valid JSON of the expected shape
    #[error("invalid pattern library: {0}")]
    InvalidLibrary(#[from] serde_json::Error),

    /// The library changed on disk since it was loaded
    #[error("pattern library changed on disk (expected version {expected}, found {found})")]
    VersionConflict {
        /// Version the caller loaded
        expected: String,
        /// Version now on disk
        found: String,
    },

    /// Another writer held the library lock for too long
    #[error("timed out after {waited:?} waiting for lock {path}")]
    LockTimeout {
        /// Lock file
        path: PathBuf,
        /// How long we waited
        waited: Duration,
    },
}

impl PatternError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
