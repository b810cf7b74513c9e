// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! station-triage: segment test station logs and triage failed tests
//!
//! This binary parses station logs into blocks, classifies failed tests
//! against a curated pattern library and keeps a SQLite history of runs.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing::debug;

use station_triage::commands;
use station_triage::config::Config;

fn main() -> Result<()> {
    let config = Config::parse();

    // Logs go to stderr; stdout carries the JSON output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(config.log_level().into()),
        )
        .init();

    config.validate().context("Invalid configuration")?;

    let Some(command) = &config.command else {
        Config::command().print_help()?;
        return Ok(());
    };
    debug!(?command, "Running command");

    if let Some(json) = commands::run(&config, command)? {
        println!("{json}");
    }
    Ok(())
}
