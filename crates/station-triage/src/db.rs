// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Triage history database
//!
//! Every recorded run stores its parse statistics, one row per test item and
//! one row per triage record, so recurring failures can be queried across
//! logs.

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use station_log::line::format_timestamp;
use station_log::{LogBlock, ParseOutcome};

use crate::migrations;
use crate::triage::{Classification, LibraryStatus, TriageReport};

/// Database errors
#[derive(Debug, Error)]
pub enum DbError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] migrations::MigrationError),

    /// Database not initialized
    #[error("Database not initialized")]
    NotInitialized,
}

/// A recorded run, as listed by [`Database::recent_runs`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: String,
    /// Log file the run came from
    pub source: String,
    /// RFC 3339 time the run was recorded
    pub recorded_at: String,
    pub test_items: i64,
    pub failed_test_items: i64,
    pub sub_items_skipped: i64,
    pub warnings: i64,
    /// `loaded` or `unavailable`
    pub library_state: String,
    pub matched: i64,
    pub unmatched: i64,
}

/// A test name ranked by how often it failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailingTestSummary {
    pub test_name: String,
    pub failures: i64,
    /// When the most recent failing run was recorded
    pub last_seen: String,
    /// Log file of the most recent failure
    pub last_source: String,
}

/// Database connection wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create a new in-memory database
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    /// Open a database file
    ///
    /// # Errors
    ///
    /// Returns an error if the database file cannot be opened.
    pub fn open(path: &std::path::Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, DbError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// Initialize the database schema using migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn initialize(&self) -> Result<(), DbError> {
        migrations::migrate(&self.conn)?;
        Ok(())
    }

    /// Check if the database is initialized and up to date
    pub fn is_initialized(&self) -> bool {
        migrations::is_up_to_date(&self.conn)
    }

    /// Get the current schema version
    ///
    /// # Errors
    ///
    /// Returns an error if the version cannot be read.
    pub fn schema_version(&self) -> Result<i32, DbError> {
        Ok(migrations::get_version(&self.conn)?)
    }

    /// Get the underlying connection (for advanced queries)
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Execute a simple query and return the count
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count(&self, table: &str) -> Result<i64, DbError> {
        let query = format!("SELECT COUNT(*) FROM {table}");
        let count: i64 = self.conn.query_row(&query, [], |row| row.get(0))?;
        Ok(count)
    }

    fn ensure_initialized(&self) -> Result<(), DbError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(DbError::NotInitialized)
        }
    }

    /// Record one parsed and triaged log
    ///
    /// The run, its test items and its triage results are written in one
    /// transaction. Returns the new run id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is not initialized or an insert fails.
    pub fn record_run(
        &mut self,
        source: &str,
        outcome: &ParseOutcome,
        report: &TriageReport,
    ) -> Result<String, DbError> {
        self.ensure_initialized()?;

        let run_id = Uuid::new_v4().to_string();
        let recorded_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let stats = &outcome.stats;
        let (library_state, library_version) = match &report.library {
            LibraryStatus::Loaded { version, .. } => ("loaded", version.clone()),
            LibraryStatus::Unavailable { .. } => ("unavailable", None),
        };

        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO parse_runs (
                id, source, recorded_at, total_lines, parsed_lines, unparsable_lines,
                sub_items_parsed, sub_items_skipped, test_items, system_blocks,
                failed_test_items, warnings, library_state, library_version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                run_id,
                source,
                recorded_at,
                stats.total_lines as i64,
                stats.parsed_lines as i64,
                stats.unparsable_lines as i64,
                stats.sub_items_parsed as i64,
                stats.sub_items_skipped as i64,
                stats.test_items as i64,
                stats.system_blocks as i64,
                stats.failed_test_items as i64,
                stats.warnings.len() as i64,
                library_state,
                library_version,
            ],
        )?;

        {
            let mut insert_item = tx.prepare(
                r#"
                INSERT INTO test_items (
                    run_id, test_name, barcode, status, start_line, end_line,
                    start_time, end_time, duration_ms, sub_items, failed_sub_items
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )?;
            for item in outcome.blocks.iter().filter_map(LogBlock::as_test_item) {
                insert_item.execute(params![
                    run_id,
                    item.test_name,
                    item.barcode,
                    item.status.as_str(),
                    item.start_line as i64,
                    item.end_line as i64,
                    item.start_time.as_ref().map(format_timestamp),
                    item.end_time.as_ref().map(format_timestamp),
                    item.duration_ms,
                    item.sub_items.len() as i64,
                    item.failed_sub_items().count() as i64,
                ])?;
            }

            let mut insert_result = tx.prepare(
                r#"
                INSERT INTO triage_results (
                    run_id, test_name, block_kind, start_line, outcome, test_group,
                    key_parts, template, pattern, owner, risk, pending, explanation
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
            )?;
            for record in &report.records {
                let matched = record.matched();
                let outcome = match record.classification {
                    Classification::Matched(_) => "matched",
                    Classification::Unmatched { .. } => "unmatched",
                    Classification::Uncategorized => "uncategorized",
                };
                insert_result.execute(params![
                    run_id,
                    record.test_name,
                    record.block_kind,
                    record.start_line as i64,
                    outcome,
                    matched.map(|m| m.test_group.as_str()),
                    matched.map(|m| m.key_parts.as_str()),
                    matched.map(|m| m.template.as_str()),
                    matched.map(|m| m.pattern.as_str()),
                    matched.and_then(|m| m.owner.as_deref()),
                    matched.and_then(|m| m.risk.as_deref()),
                    matched.is_some_and(|m| m.pending),
                    record.explanation,
                ])?;
            }
        }
        tx.commit()?;

        debug!(
            run_id = %run_id,
            source,
            test_items = stats.test_items,
            triaged = report.records.len(),
            "Recorded run"
        );
        Ok(run_id)
    }

    /// Most recently recorded runs, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database is not initialized or the query fails.
    pub fn recent_runs(&self, limit: usize) -> Result<Vec<RunSummary>, DbError> {
        self.ensure_initialized()?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT pr.id, pr.source, pr.recorded_at, pr.test_items, pr.failed_test_items,
                   pr.sub_items_skipped, pr.warnings, pr.library_state,
                   (SELECT COUNT(*) FROM triage_results t
                     WHERE t.run_id = pr.id AND t.outcome = 'matched'),
                   (SELECT COUNT(*) FROM triage_results t
                     WHERE t.run_id = pr.id AND t.outcome = 'unmatched')
            FROM parse_runs pr
            ORDER BY pr.recorded_at DESC, pr.rowid DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            Ok(RunSummary {
                id: row.get(0)?,
                source: row.get(1)?,
                recorded_at: row.get(2)?,
                test_items: row.get(3)?,
                failed_test_items: row.get(4)?,
                sub_items_skipped: row.get(5)?,
                warnings: row.get(6)?,
                library_state: row.get(7)?,
                matched: row.get(8)?,
                unmatched: row.get(9)?,
            })
        })?;

        let mut runs = Vec::new();
        for row in rows {
            runs.push(row?);
        }
        Ok(runs)
    }

    /// Test names with the most failures across all runs
    ///
    /// # Errors
    ///
    /// Returns an error if the database is not initialized or the query fails.
    pub fn top_failing_tests(&self, limit: usize) -> Result<Vec<FailingTestSummary>, DbError> {
        self.ensure_initialized()?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT ft.test_name,
                   COUNT(*) AS failures,
                   MAX(ft.recorded_at) AS last_seen,
                   (SELECT f2.source FROM failing_tests f2
                     WHERE f2.test_name = ft.test_name
                     ORDER BY f2.recorded_at DESC
                     LIMIT 1)
            FROM failing_tests ft
            GROUP BY ft.test_name
            ORDER BY failures DESC, last_seen DESC, ft.test_name
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            Ok(FailingTestSummary {
                test_name: row.get(0)?,
                failures: row.get(1)?,
                last_seen: row.get(2)?,
                last_source: row.get(3)?,
            })
        })?;

        let mut tests = Vec::new();
        for row in rows {
            tests.push(row?);
        }
        Ok(tests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;
    use station_log::{SegmenterOptions, parse_log};
    use station_patterns::PatternLibrary;

    use crate::triage::{TriageOptions, Triager};

    fn line(context: &str, keyword: &str, message: &str) -> String {
        format!(
            "2025-09-15 13:00:00,000 [] INFO  TEST_APP_2010\t13:00:00.0000000\t{context}\t{keyword}\t{message}\n"
        )
    }

    fn test_log(name: &str, code: u32) -> String {
        [
            line(name, "Header", &format!("===== Test = {name} | Barcode = SN1 =====")),
            line(
                name,
                "Footer",
                &format!("Test = {name} | Overall Result = {code} | Test Time = 100 msec"),
            ),
            line("END_OF_TEST", "Footer", "done"),
        ]
        .concat()
    }

    fn initialized() -> Database {
        let db = Database::in_memory().expect("should create db");
        db.initialize().expect("should initialize");
        db
    }

    fn record(db: &mut Database, source: &str, log: &str) -> String {
        let outcome = parse_log(log, &SegmenterOptions::default());
        let library = PatternLibrary::from_json(
            r#"{"Audio": {"Mic": [{"TEST ITEMS": "MIC", "List of Regular Expressions": ["^MIC_"]}]}}"#,
        )
        .expect("library");
        let report =
            Triager::with_library(library, TriageOptions::default()).triage(&outcome.blocks);
        db.record_run(source, &outcome, &report).expect("record")
    }

    #[test]
    fn test_database_initialize() {
        let db = Database::in_memory().expect("should create db");
        assert!(!db.is_initialized());
        db.initialize().expect("should initialize");
        assert!(db.is_initialized());
        assert_eq!(db.schema_version().expect("version"), migrations::CURRENT_VERSION);
    }

    #[test]
    fn test_database_initialize_idempotent() {
        let db = initialized();
        db.initialize().expect("second init should succeed");
        assert!(db.is_initialized());
    }

    #[test]
    fn test_record_run_requires_initialization() {
        let mut db = Database::in_memory().expect("should create db");
        let outcome = ParseOutcome::default();
        let report = Triager::with_library(PatternLibrary::new(), TriageOptions::default())
            .triage(&outcome.blocks);
        assert!(matches!(
            db.record_run("a.log", &outcome, &report),
            Err(DbError::NotInitialized)
        ));
    }

    #[test]
    fn test_record_run_inserts_items_and_results() {
        let mut db = initialized();
        let log = [test_log("MIC_1", 2), test_log("SPK_1", 0), test_log("WIFI_1", 3)].concat();
        let run_id = record(&mut db, "station1.log", &log);

        assert_eq!(db.count("parse_runs").expect("count"), 1);
        assert_eq!(db.count("test_items").expect("count"), 3);
        assert_eq!(db.count("triage_results").expect("count"), 2);

        let outcomes: Vec<(String, String)> = db
            .connection()
            .prepare("SELECT test_name, outcome FROM triage_results WHERE run_id = ?1 ORDER BY id")
            .expect("prepare")
            .query_map([&run_id], |row| Ok((row.get(0)?, row.get(1)?)))
            .expect("query")
            .collect::<Result<_, _>>()
            .expect("rows");
        assert_eq!(
            outcomes,
            vec![
                ("MIC_1".to_string(), "matched".to_string()),
                ("WIFI_1".to_string(), "unmatched".to_string()),
            ]
        );
    }

    #[test]
    fn test_recent_runs_newest_first() {
        let mut db = initialized();
        let first = record(&mut db, "first.log", &test_log("MIC_1", 1));
        let second = record(&mut db, "second.log", &test_log("SPK_1", 0));

        let runs = db.recent_runs(10).expect("runs");
        let ids: Vec<&str> = runs.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![second.as_str(), first.as_str()]);
        assert_eq!(runs[1].matched, 1);
        assert_eq!(runs[1].library_state, "loaded");
        assert_eq!(db.recent_runs(1).expect("runs").len(), 1);
    }

    #[test]
    fn test_top_failing_tests() {
        let mut db = initialized();
        record(&mut db, "a.log", &[test_log("MIC_1", 1), test_log("SPK_1", 1)].concat());
        record(&mut db, "b.log", &test_log("MIC_1", 2));
        record(&mut db, "c.log", &test_log("SPK_1", 0));

        let top = db.top_failing_tests(10).expect("top");
        let ranked: Vec<(&str, i64)> = top
            .iter()
            .map(|t| (t.test_name.as_str(), t.failures))
            .collect();
        assert_eq!(ranked, vec![("MIC_1", 2), ("SPK_1", 1)]);
        assert_eq!(top[0].last_source, "b.log");
    }

    #[test]
    fn test_run_rows_cascade_on_delete() {
        let mut db = initialized();
        let run_id = record(&mut db, "a.log", &test_log("MIC_1", 1));
        db.connection()
            .execute("DELETE FROM parse_runs WHERE id = ?1", [&run_id])
            .expect("delete");
        assert_eq!(db.count("test_items").expect("count"), 0);
        assert_eq!(db.count("triage_results").expect("count"), 0);
    }
}
