// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Best-effort naming of system-level blocks
//!
//! Station software writes the operation name of system activity into a
//! tab-separated column. Which column depends on whether the line has an
//! empty field (two consecutive tabs): column 6 if it does, column 5 if it
//! does not, each with the next column as a fallback. This is a heuristic
//! pinned by fixtures, not a grammar.

use std::sync::LazyLock;

use regex::Regex;

use crate::block::BlockStatus;
use crate::line::KEYWORD_EVAL;

static EVAL_STATUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*\s(PASSED|\* FAILED \*)\s").expect("system status regex is valid")
});

/// Infer an operation name from the first line that yields one
#[must_use]
pub fn infer_system_name<S: AsRef<str>>(lines: &[S]) -> Option<String> {
    lines.iter().find_map(|line| name_from_line(line.as_ref()))
}

fn name_from_line(line: &str) -> Option<String> {
    let column = if line.contains("\t\t") { 6 } else { 5 };
    let parts: Vec<&str> = line.split('\t').collect();

    [column, column + 1]
        .into_iter()
        .filter_map(|i| parts.get(i))
        .map(|part| part.trim().replace(['[', ']'], ""))
        .find(|name| !name.is_empty())
}

/// Infer a status from the first measurement line carrying a verdict
#[must_use]
pub fn infer_system_status<S: AsRef<str>>(lines: &[S]) -> BlockStatus {
    lines
        .iter()
        .map(AsRef::as_ref)
        .filter(|line| line.contains(KEYWORD_EVAL))
        .find_map(|line| EVAL_STATUS_RE.captures(line))
        .map_or(BlockStatus::Unknown, |caps| {
            if caps[1].contains("FAILED") {
                BlockStatus::Fail
            } else {
                BlockStatus::Pass
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    const SINGLE_TAB: &str =
        "2025-09-15 13:05:01,000 [] INFO  STATION\t13:05:01.000001\tSYSTEM\tStep\tbegin\t[Reboot DUT]\tok";
    const DOUBLE_TAB: &str =
        "2025-09-15 13:05:02,000 [] INFO  STATION\t13:05:02.000001\tSYSTEM\tStep\t\tbegin\t[Load Config]";
    const EMPTY_COLUMN: &str =
        "2025-09-15 13:05:03,000 [] INFO  STATION\t13:05:03.000001\tSYSTEM\tStep\tbegin\t \tFlash Radio";

    #[test]
    fn test_single_tab_uses_column_five() {
        assert_eq!(infer_system_name(&[SINGLE_TAB]).as_deref(), Some("Reboot DUT"));
    }

    #[test]
    fn test_double_tab_uses_column_six() {
        assert_eq!(infer_system_name(&[DOUBLE_TAB]).as_deref(), Some("Load Config"));
    }

    #[test]
    fn test_blank_column_falls_back_to_next() {
        assert_eq!(infer_system_name(&[EMPTY_COLUMN]).as_deref(), Some("Flash Radio"));
    }

    #[test]
    fn test_first_line_with_a_name_wins() {
        let lines = ["no tabs here", SINGLE_TAB, DOUBLE_TAB];
        assert_eq!(infer_system_name(&lines).as_deref(), Some("Reboot DUT"));
    }

    #[test]
    fn test_no_name_found() {
        assert_eq!(infer_system_name(&["a\tb\tc"]), None);
        assert_eq!(infer_system_name::<&str>(&[]), None);
    }

    #[test]
    fn test_status_from_first_eval_line() {
        let lines = [
            "2025-09-15 13:05:01,000 [] INFO M\t13:05:01.0\tSYS\tEvalAndLogResults\t1 1 Volt 0 5 3 V 1 1 * FAILED * <--*--> 1 F F X",
            "2025-09-15 13:05:02,000 [] INFO M\t13:05:02.0\tSYS\tEvalAndLogResults\t1 2 Volt 0 5 3 V 1 1 PASSED <--*--> 1 F F X",
        ];
        assert_eq!(infer_system_status(&lines), BlockStatus::Fail);
        assert_eq!(infer_system_status(&lines[1..]), BlockStatus::Pass);
    }

    #[test]
    fn test_status_ignores_non_eval_lines() {
        let lines = ["2025-09-15 13:05:01,000 [] INFO M\t13:05:01.0\tSYS\tStep\tall PASSED here"];
        assert_eq!(infer_system_status(&lines), BlockStatus::Unknown);
    }
}
