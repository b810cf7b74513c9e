// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! station-triage library
//!
//! This module exports the triage pipeline, the history database and the
//! CLI commands of station-triage for use in integration tests and as a
//! library.

pub mod commands;
pub mod config;
pub mod db;
pub mod explain;
pub mod migrations;
pub mod triage;

pub use config::{Command, Config, ConfigError};
pub use db::{Database, DbError, FailingTestSummary, RunSummary};
pub use explain::{ExplainError, ExplainRequest, Explainer, PromptSet};
pub use triage::{
    Classification, FileTriage, LibraryStatus, MatchedEntry, TriageError, TriageOptions,
    TriageRecord, TriageReport, Triager, triage_file,
};
