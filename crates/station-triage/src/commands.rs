// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Subcommand implementations
//!
//! Each command returns the JSON it would print, or `None` when the result
//! was written to an output path instead.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use station_log::{
    ParseOutcome, SegmenterOptions, blocks_to_json, discover_log_files, parse_log_file,
    write_blocks_json,
};
use station_patterns::LibraryStore;

use crate::config::{Command, Config, ConfigError};
use crate::db::Database;
use crate::triage::{FileTriage, TriageOptions, Triager, triage_file};

/// Run `command` with the global settings in `config`
///
/// # Errors
///
/// Returns an error if an input cannot be read, an output cannot be written
/// or the history database is unusable.
pub fn run(config: &Config, command: &Command) -> Result<Option<String>> {
    match command {
        Command::Parse {
            input,
            output,
            no_system_names,
            stats,
        } => {
            let options = SegmenterOptions {
                infer_system_names: !no_system_names,
                ..SegmenterOptions::default()
            };
            parse(input, output.as_deref(), &options, *stats)
        }
        Command::Triage {
            input,
            output,
            no_register,
            prompts,
            no_record,
        } => {
            let options = TriageOptions {
                register_unmatched: !no_register,
                build_prompts: *prompts,
            };
            triage(config, input, output.as_deref(), options, !no_record)
        }
        Command::History { limit } => history(config, *limit),
    }
}

/// Open the history database, migrating it unless `--skip-init` was given
///
/// # Errors
///
/// Returns an error if the file cannot be opened or migrated.
pub fn open_database(config: &Config) -> Result<Database> {
    let path = config.database_path();
    let db = Database::open(&path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;

    if config.skip_init {
        if !db.is_initialized() {
            warn!(path = %path.display(), "Database is not initialized; queries may fail");
        }
    } else {
        db.initialize()
            .map_err(|e| ConfigError::DatabaseInitFailed(e.to_string()))?;
    }
    Ok(db)
}

fn log_files(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_dir() {
        discover_log_files(input)
            .with_context(|| format!("Failed to scan {}", input.display()))
    } else {
        Ok(vec![input.to_path_buf()])
    }
}

// ============================================================================
// parse
// ============================================================================

/// Segment one log, or every log under a directory
///
/// A single file is written to `output` as a JSON array of blocks. For a
/// directory, `output` is a directory that receives one `.json` file per
/// log, mirroring the input layout; without `output` the result is a JSON
/// object keyed by log path. With `with_stats` each array is replaced by an
/// object holding the blocks and the [`ParseStats`](station_log::ParseStats)
/// of that log.
///
/// # Errors
///
/// Returns an error if a log cannot be read or an output cannot be written.
pub fn parse(
    input: &Path,
    output: Option<&Path>,
    options: &SegmenterOptions,
    with_stats: bool,
) -> Result<Option<String>> {
    if !input.is_dir() {
        let outcome = parse_log_file(input, options)
            .with_context(|| format!("Failed to parse {}", input.display()))?;
        info!(
            path = %input.display(),
            blocks = outcome.blocks.len(),
            skipped = outcome.stats.sub_items_skipped,
            "Parsed log"
        );
        return match output {
            Some(out) => {
                write_parse_output(out, &outcome, with_stats)?;
                Ok(None)
            }
            None => Ok(Some(parse_output_json(&outcome, with_stats)?)),
        };
    }

    let mut combined = Map::new();
    for path in log_files(input)? {
        let outcome = parse_log_file(&path, options)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!(
            path = %path.display(),
            blocks = outcome.blocks.len(),
            skipped = outcome.stats.sub_items_skipped,
            "Parsed log"
        );

        match output {
            Some(out) => {
                let relative = path.strip_prefix(input).unwrap_or(&path);
                let target = out.join(relative).with_extension("json");
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {}", parent.display()))?;
                }
                write_parse_output(&target, &outcome, with_stats)?;
            }
            None => {
                let value = if with_stats {
                    serde_json::to_value(&outcome)?
                } else {
                    serde_json::to_value(&outcome.blocks)?
                };
                combined.insert(path.display().to_string(), value);
            }
        }
    }

    match output {
        Some(_) => Ok(None),
        None => Ok(Some(serde_json::to_string_pretty(&Value::Object(combined))?)),
    }
}

fn parse_output_json(outcome: &ParseOutcome, with_stats: bool) -> Result<String> {
    if with_stats {
        Ok(serde_json::to_string_pretty(outcome)?)
    } else {
        Ok(blocks_to_json(&outcome.blocks)?)
    }
}

fn write_parse_output(path: &Path, outcome: &ParseOutcome, with_stats: bool) -> Result<()> {
    if with_stats {
        fs::write(path, parse_output_json(outcome, true)?)
            .with_context(|| format!("Failed to write {}", path.display()))
    } else {
        Ok(write_blocks_json(path, &outcome.blocks)?)
    }
}

// ============================================================================
// triage
// ============================================================================

/// Triage one log, or every log under a directory
///
/// Logs in a directory that cannot be read are skipped with a warning; a
/// single unreadable file is an error.
///
/// # Errors
///
/// Returns an error if the input cannot be read, the database cannot be
/// opened or the report cannot be written.
pub fn triage(
    config: &Config,
    input: &Path,
    output: Option<&Path>,
    options: TriageOptions,
    record: bool,
) -> Result<Option<String>> {
    let store = LibraryStore::new(config.library_path());
    let mut triager = Triager::open(store, options);
    let mut db = if record {
        Some(open_database(config)?)
    } else {
        None
    };

    let segmenter = SegmenterOptions::default();
    let mut results: Vec<FileTriage> = Vec::new();
    for path in log_files(input)? {
        match triage_file(&path, &segmenter, &mut triager, db.as_mut()) {
            Ok(result) => results.push(result),
            Err(e) if input.is_dir() => {
                warn!(path = %path.display(), error = %e, "Skipping log");
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to triage {}", path.display()));
            }
        }
    }

    let json = serde_json::to_string_pretty(&results)?;
    match output {
        Some(out) => {
            fs::write(out, json).with_context(|| format!("Failed to write {}", out.display()))?;
            Ok(None)
        }
        None => Ok(Some(json)),
    }
}

// ============================================================================
// history
// ============================================================================

/// Recent runs and most frequently failing tests
///
/// # Errors
///
/// Returns an error if the database cannot be opened or queried.
pub fn history(config: &Config, limit: usize) -> Result<Option<String>> {
    let db = open_database(config)?;
    let report = json!({
        "recent_runs": db.recent_runs(limit)?,
        "top_failing_tests": db.top_failing_tests(limit)?,
    });
    Ok(Some(serde_json::to_string_pretty(&report)?))
}
