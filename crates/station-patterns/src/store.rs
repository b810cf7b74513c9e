// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! File-backed pattern library with serialized updates
//!
//! A library file is always replaced as a whole document, so concurrent
//! writers would otherwise lose each other's additions. Every write here:
//!
//! 1. takes an exclusive advisory lock on `<library>.lock`, polling until a
//!    timeout,
//! 2. re-reads the document currently on disk,
//! 3. writes the new document to a temporary file in the same directory and
//!    renames it over the library.
//!
//! Readers never lock; the rename makes every read see a complete document.
//! A document's version is the SHA-256 of its bytes, which lets callers that
//! edit a library they loaded earlier detect a conflicting write
//! ([`LibraryStore::save`]).

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs4::fs_std::FileExt;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::entry::{PatternEntry, UNCLASSIFIED};
use crate::error::PatternError;
use crate::library::PatternLibrary;

/// How long a writer waits for the library lock by default
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A library and the version of the document it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedLibrary {
    pub library: PatternLibrary,
    pub version: String,
}

/// A test name that needs a placeholder entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderRequest {
    pub test_name: String,
    /// Failure log lines attached to the new entry for the curator
    pub failure_logs: Vec<String>,
}

/// Result of [`LibraryStore::register_placeholders`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterOutcome {
    /// Names that received a new entry, in request order
    pub added: Vec<String>,
    /// Names skipped because a template already existed
    pub already_present: Vec<String>,
    /// Version on disk afterwards; `None` if no file exists
    pub version: Option<String>,
}

/// SHA-256 hex digest of a library document
#[must_use]
pub fn content_version(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// A pattern library stored in a JSON file
#[derive(Debug, Clone)]
pub struct LibraryStore {
    path: PathBuf,
    lock_timeout: Duration,
}

impl LibraryStore {
    /// Create a store for the library at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Set how long writers wait for the lock
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Path of the library file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the lock file guarding writes
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Load the library and its version
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::LibraryNotFound`] if the file does not exist,
    /// [`PatternError::InvalidLibrary`] if it cannot be parsed, or an IO error.
    pub fn load(&self) -> Result<VersionedLibrary, PatternError> {
        let bytes = self
            .read_bytes()?
            .ok_or_else(|| PatternError::LibraryNotFound(self.path.clone()))?;
        let library: PatternLibrary = serde_json::from_slice(&bytes)?;
        let version = content_version(&bytes);

        debug!(
            path = %self.path.display(),
            entries = library.entry_count(),
            version = %version,
            "Loaded pattern library"
        );
        Ok(VersionedLibrary { library, version })
    }

    /// Version of the document currently on disk, if any
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file exists but cannot be read.
    pub fn current_version(&self) -> Result<Option<String>, PatternError> {
        Ok(self.read_bytes()?.as_deref().map(content_version))
    }

    /// Add placeholder entries for test names no template covers
    ///
    /// Runs as one locked read-modify-write against the document on disk,
    /// not against any copy the caller loaded earlier. Names already present
    /// as a template (including earlier names in the same batch) are skipped.
    /// A missing library file is created; an unparsable one is left alone.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::LockTimeout`] if the lock cannot be taken,
    /// [`PatternError::InvalidLibrary`] if the current document is invalid,
    /// or an IO error.
    pub fn register_placeholders(
        &self,
        requests: &[PlaceholderRequest],
    ) -> Result<RegisterOutcome, PatternError> {
        let _lock = self.lock()?;

        let current = self.read_bytes()?;
        let mut library = match &current {
            Some(bytes) => serde_json::from_slice(bytes)?,
            None => PatternLibrary::new(),
        };

        let mut outcome = RegisterOutcome::default();
        for request in requests {
            let name = request.test_name.trim();
            if name.is_empty() {
                continue;
            }
            if library.contains_template(name) {
                outcome.already_present.push(name.to_string());
                continue;
            }
            library.add_entry(
                UNCLASSIFIED,
                UNCLASSIFIED,
                PatternEntry::placeholder(name, &request.failure_logs),
            );
            outcome.added.push(name.to_string());
        }

        outcome.version = if outcome.added.is_empty() {
            current.as_deref().map(content_version)
        } else {
            let version = self.write_atomic(&library)?;
            info!(
                path = %self.path.display(),
                added = outcome.added.len(),
                "Registered placeholder entries"
            );
            Some(version)
        };
        Ok(outcome)
    }

    /// Replace the library, provided nobody wrote since `expected_version`
    ///
    /// `expected_version` is the version returned by [`load`](Self::load),
    /// or `None` when the caller expects no file to exist yet. Returns the
    /// new version.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::VersionConflict`] if the document on disk is
    /// not the expected one, [`PatternError::LockTimeout`] if the lock cannot
    /// be taken, or an IO error.
    pub fn save(
        &self,
        library: &PatternLibrary,
        expected_version: Option<&str>,
    ) -> Result<String, PatternError> {
        let _lock = self.lock()?;

        let found = self.current_version()?;
        if found.as_deref() != expected_version {
            return Err(PatternError::VersionConflict {
                expected: expected_version.unwrap_or("<none>").to_string(),
                found: found.unwrap_or_else(|| "<none>".to_string()),
            });
        }
        self.write_atomic(library)
    }

    fn read_bytes(&self) -> Result<Option<Vec<u8>>, PatternError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PatternError::io(&self.path, e)),
        }
    }

    fn write_atomic(&self, library: &PatternLibrary) -> Result<String, PatternError> {
        let json = library.to_json_pretty()?;
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|e| PatternError::io(parent, e))?;

        let mut temp =
            tempfile::NamedTempFile::new_in(parent).map_err(|e| PatternError::io(parent, e))?;
        temp.write_all(json.as_bytes())
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| PatternError::io(temp.path(), e))?;
        temp.persist(&self.path)
            .map_err(|e| PatternError::io(&self.path, e.error))?;

        Ok(content_version(json.as_bytes()))
    }

    fn lock(&self) -> Result<LockedFile, PatternError> {
        let path = self.lock_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PatternError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| PatternError::io(&path, e))?;

        let start = Instant::now();
        loop {
            if matches!(FileExt::try_lock_exclusive(&file), Ok(true)) {
                return Ok(LockedFile { file });
            }
            if start.elapsed() >= self.lock_timeout {
                return Err(PatternError::LockTimeout {
                    path,
                    waited: start.elapsed(),
                });
            }
            std::thread::sleep(LOCK_POLL_INTERVAL);
        }
    }
}

/// A file handle with an exclusive lock. Unlocks on drop.
struct LockedFile {
    file: File,
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
