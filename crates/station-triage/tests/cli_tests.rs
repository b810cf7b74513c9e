// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! CLI parsing tests
//!
//! These tests verify flag and subcommand parsing without running any
//! command.

use clap::Parser;
use similar_asserts::assert_eq;
use station_triage::config::{Command, Config};
use std::path::PathBuf;

// ============================================================================
// Global flags
// ============================================================================

#[test]
fn test_no_arguments_parses_without_command() {
    let config = Config::try_parse_from(["station-triage"]).expect("parse should succeed");
    assert!(config.command.is_none());
    assert!(!config.verbose);
    assert!(!config.quiet);
}

#[test]
fn test_library_short_and_long_flags() {
    let short = Config::try_parse_from(["station-triage", "-l", "/lib/a.json"])
        .expect("parse should succeed");
    let long = Config::try_parse_from(["station-triage", "--library", "/lib/b.json"])
        .expect("parse should succeed");
    assert_eq!(short.library, Some(PathBuf::from("/lib/a.json")));
    assert_eq!(long.library_path(), PathBuf::from("/lib/b.json"));
}

#[test]
fn test_database_short_flag_d() {
    let config = Config::try_parse_from(["station-triage", "-d", "/custom/history.db"])
        .expect("parse should succeed");
    assert_eq!(config.database_path(), PathBuf::from("/custom/history.db"));
}

#[test]
fn test_database_flag_missing_value_fails() {
    let result = Config::try_parse_from(["station-triage", "--database"]);
    assert!(result.is_err());
}

#[test]
fn test_verbose_and_quiet_levels() {
    let verbose = Config::try_parse_from(["station-triage", "-v"]).expect("parse should succeed");
    assert_eq!(verbose.log_level(), tracing::Level::DEBUG);

    let quiet =
        Config::try_parse_from(["station-triage", "--quiet"]).expect("parse should succeed");
    assert_eq!(quiet.log_level(), tracing::Level::WARN);
}

#[test]
fn test_skip_init_value_syntax_not_supported() {
    let result = Config::try_parse_from(["station-triage", "--skip-init=true"]);
    assert!(result.is_err(), "Boolean flags don't support =value syntax");
}

#[test]
fn test_global_flags_before_subcommand() {
    let config = Config::try_parse_from([
        "station-triage",
        "--skip-init",
        "-l",
        "lib.json",
        "history",
    ])
    .expect("parse should succeed");
    assert!(config.skip_init);
    assert!(matches!(config.command, Some(Command::History { limit: 10 })));
}

// ============================================================================
// parse
// ============================================================================

#[test]
fn test_parse_subcommand() {
    let config = Config::try_parse_from([
        "station-triage",
        "parse",
        "station.log",
        "-o",
        "blocks.json",
        "--no-system-names",
        "--stats",
    ])
    .expect("parse should succeed");

    match config.command {
        Some(Command::Parse {
            input,
            output,
            no_system_names,
            stats,
        }) => {
            assert_eq!(input, PathBuf::from("station.log"));
            assert_eq!(output, Some(PathBuf::from("blocks.json")));
            assert!(no_system_names);
            assert!(stats);
        }
        other => panic!("Expected parse command, got {other:?}"),
    }
}

#[test]
fn test_parse_requires_input() {
    let result = Config::try_parse_from(["station-triage", "parse"]);
    assert!(result.is_err());
}

#[test]
fn test_parse_never_uses_database() {
    let config = Config::try_parse_from(["station-triage", "parse", "a.log"])
        .expect("parse should succeed");
    assert!(!config.command.expect("command").uses_database());
}

// ============================================================================
// triage
// ============================================================================

#[test]
fn test_triage_defaults() {
    let config = Config::try_parse_from(["station-triage", "triage", "logs/"])
        .expect("parse should succeed");

    let command = config.command.expect("command");
    assert!(command.uses_database());
    match command {
        Command::Triage {
            input,
            output,
            no_register,
            prompts,
            no_record,
        } => {
            assert_eq!(input, PathBuf::from("logs/"));
            assert!(output.is_none());
            assert!(!no_register);
            assert!(!prompts);
            assert!(!no_record);
        }
        other => panic!("Expected triage command, got {other:?}"),
    }
}

#[test]
fn test_triage_switches() {
    let config = Config::try_parse_from([
        "station-triage",
        "triage",
        "a.log",
        "--no-register",
        "--prompts",
        "--no-record",
    ])
    .expect("parse should succeed");

    let command = config.command.expect("command");
    assert!(!command.uses_database());
    match command {
        Command::Triage {
            no_register,
            prompts,
            ..
        } => {
            assert!(no_register);
            assert!(prompts);
        }
        other => panic!("Expected triage command, got {other:?}"),
    }
}

// ============================================================================
// history
// ============================================================================

#[test]
fn test_history_limit() {
    let config = Config::try_parse_from(["station-triage", "history", "--limit", "3"])
        .expect("parse should succeed");
    assert!(matches!(config.command, Some(Command::History { limit: 3 })));
}

#[test]
fn test_history_rejects_negative_limit() {
    let result = Config::try_parse_from(["station-triage", "history", "--limit", "-1"]);
    assert!(result.is_err());
}

#[test]
fn test_unknown_subcommand_fails() {
    let result = Config::try_parse_from(["station-triage", "serve"]);
    assert!(result.is_err());
}
