// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Configuration for the station-triage CLI
//!
//! This module provides the command-line configuration: library and
//! database locations, logging options and the subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Station Triage - segment test station logs and classify failed tests
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "station-triage")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to the pattern library JSON file
    ///
    /// Unmatched failed tests are registered here as placeholder entries.
    /// Defaults to patterns.json in the platform data directory.
    #[arg(short, long, env = "STATION_TRIAGE_LIBRARY")]
    pub library: Option<PathBuf>,

    /// Path to the SQLite history database
    ///
    /// If the file doesn't exist, it will be created and initialized.
    /// Defaults to history.db in the platform data directory.
    #[arg(short, long, env = "STATION_TRIAGE_DATABASE")]
    pub database: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    ///
    /// Logs are written to stderr so JSON output on stdout stays clean.
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,

    /// Quiet mode - suppress info-level logs
    ///
    /// Only errors and warnings will be logged.
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,

    /// Skip database initialization/migration check
    ///
    /// Useful when connecting to an externally managed database.
    #[arg(long, default_value = "false")]
    pub skip_init: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Segment a log file (or every log under a directory) into blocks
    ///
    /// Example:
    ///   station-triage parse station.log --output blocks.json
    Parse {
        /// Log file or directory of logs
        input: PathBuf,

        /// Write JSON here instead of stdout (a directory for directory input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not infer names and statuses of system-level blocks
        #[arg(long)]
        no_system_names: bool,

        /// Wrap each log's blocks with its parse statistics
        #[arg(long)]
        stats: bool,
    },

    /// Classify failed tests against the pattern library
    ///
    /// Example:
    ///   station-triage -l patterns.json triage logs/ --prompts
    Triage {
        /// Log file or directory of logs
        input: PathBuf,

        /// Write the JSON report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not add placeholder entries for unmatched tests
        #[arg(long)]
        no_register: bool,

        /// Attach explanation and failure-analysis prompts to each record
        #[arg(long)]
        prompts: bool,

        /// Do not record the run in the history database
        #[arg(long)]
        no_record: bool,
    },

    /// Show recent runs and the most frequently failing tests
    History {
        /// Number of entries to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

impl Command {
    /// Log input of `parse` and `triage`
    #[must_use]
    pub fn input(&self) -> Option<&PathBuf> {
        match self {
            Self::Parse { input, .. } | Self::Triage { input, .. } => Some(input),
            Self::History { .. } => None,
        }
    }

    /// Check if the command reads or writes the history database
    #[must_use]
    pub fn uses_database(&self) -> bool {
        match self {
            Self::Parse { .. } => false,
            Self::Triage { no_record, .. } => !no_record,
            Self::History { .. } => true,
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("station-triage")
}

impl Config {
    /// Get the database path, using a default if not specified
    ///
    /// Default location is platform-specific:
    /// - macOS: ~/Library/Application Support/station-triage/history.db
    /// - Linux: ~/.local/share/station-triage/history.db
    /// - Windows: %LOCALAPPDATA%\station-triage\history.db
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| data_dir().join("history.db"))
    }

    /// Get the pattern library path, using a default if not specified
    #[must_use]
    pub fn library_path(&self) -> PathBuf {
        self.library
            .clone()
            .unwrap_or_else(|| data_dir().join("patterns.json"))
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The command's input path doesn't exist
    /// - The database parent directory cannot be created (only checked for
    ///   commands that use the database)
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Some(command) = &self.command else {
            return Ok(());
        };

        if let Some(input) = command.input()
            && !input.exists()
        {
            return Err(ConfigError::InputNotFound(input.clone()));
        }

        if command.uses_database() {
            let db_path = self.database_path();
            if let Some(parent) = db_path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ConfigError::DatabaseDirectoryCreateFailed(parent.to_path_buf(), e)
                })?;
            }
        }

        Ok(())
    }

    /// Get the log level based on verbose/quiet flags
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else if self.quiet {
            tracing::Level::WARN
        } else {
            tracing::Level::INFO
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Input log path not found
    #[error("Input path not found: {0}")]
    InputNotFound(PathBuf),

    /// Failed to create database directory
    #[error("Failed to create database directory {0}: {1}")]
    DatabaseDirectoryCreateFailed(PathBuf, std::io::Error),

    /// Database initialization failed
    #[error("Database initialization failed: {0}")]
    DatabaseInitFailed(String),
}
