// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Pattern library entries
//!
//! Field names follow the curated library's JSON layout, which comes from
//! the station's spreadsheet columns (`"TEST ITEMS"`, `"Key parts"`, ...).
//! Fields this crate does not know about are kept in [`PatternEntry::extra`]
//! so a rewrite never loses curator data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::serde_utils::{lenient_text, string_list, text};

/// Group and key-parts name given to entries synthesized for unmatched tests
pub const UNCLASSIFIED: &str = "unclassified";

/// Metadata value of synthesized entries awaiting curation
pub const PENDING: &str = "pending";

/// Prompt templates for an external explanation service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiPrompt {
    /// Prompt asking what the test item checks
    #[serde(rename = "测试项解释", default, deserialize_with = "text")]
    pub explanation: String,
    /// Prompt asking for failure analysis and advice
    #[serde(rename = "异常日志分析与建议", default, deserialize_with = "text")]
    pub failure_analysis: String,
}

/// Curated failure analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSuggestion {
    /// Log lines recorded when the entry was created
    #[serde(rename = "异常日志", default, deserialize_with = "string_list")]
    pub failure_logs: Vec<String>,
    /// Possible root causes
    #[serde(rename = "可能的失败原因", default, deserialize_with = "string_list")]
    pub possible_causes: Vec<String>,
    /// Suggested fixes
    #[serde(rename = "建议的解决方案", default, deserialize_with = "string_list")]
    pub solutions: Vec<String>,
    /// Preventive measures
    #[serde(rename = "预防措施", default, deserialize_with = "string_list")]
    pub prevention: Vec<String>,
}

/// One curated test-item template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternEntry {
    #[serde(rename = "Test Group", default, deserialize_with = "text")]
    pub test_group: String,
    #[serde(rename = "Key parts", default, deserialize_with = "text")]
    pub key_parts: String,
    /// Test-item template name
    #[serde(rename = "TEST ITEMS", default, deserialize_with = "text")]
    pub test_item: String,
    #[serde(rename = "Method", default, deserialize_with = "lenient_text")]
    pub method: Option<String>,
    #[serde(rename = "Test detail information", default, deserialize_with = "lenient_text")]
    pub detail_info: Option<String>,
    #[serde(rename = "Dependency", default, deserialize_with = "lenient_text")]
    pub dependency: Option<String>,
    #[serde(rename = "Principle", default, deserialize_with = "lenient_text")]
    pub principle: Option<String>,
    #[serde(rename = "Impact", default, deserialize_with = "lenient_text")]
    pub impact: Option<String>,
    #[serde(rename = "Risk", default, deserialize_with = "lenient_text")]
    pub risk: Option<String>,
    #[serde(rename = "Owner", default, deserialize_with = "lenient_text")]
    pub owner: Option<String>,
    /// Tried in order, anchored at the start of the test name
    #[serde(
        rename = "List of Regular Expressions",
        default,
        deserialize_with = "string_list"
    )]
    pub regexes: Vec<String>,
    #[serde(rename = "AI Prompt", default, skip_serializing_if = "Option::is_none")]
    pub ai_prompt: Option<AiPrompt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_suggest: Option<AnalysisSuggestion>,
    /// Curation state; [`PENDING`] for synthesized entries
    #[serde(
        rename = "Status",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,
    /// Unrecognized fields, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PatternEntry {
    /// Entry for a test name no pattern matched
    ///
    /// Metadata is set to [`PENDING`] and the only regex matches the name
    /// literally anywhere in a test name.
    #[must_use]
    pub fn placeholder(test_name: &str, failure_logs: &[String]) -> Self {
        let pending = || Some(PENDING.to_string());
        Self {
            test_group: UNCLASSIFIED.to_string(),
            key_parts: UNCLASSIFIED.to_string(),
            test_item: test_name.to_string(),
            method: pending(),
            detail_info: pending(),
            dependency: pending(),
            principle: pending(),
            impact: pending(),
            risk: pending(),
            owner: pending(),
            regexes: vec![format!(".*{}.*", regex::escape(test_name))],
            ai_prompt: Some(AiPrompt {
                explanation: PENDING.to_string(),
                failure_analysis: PENDING.to_string(),
            }),
            analysis_suggest: Some(AnalysisSuggestion {
                failure_logs: failure_logs.to_vec(),
                possible_causes: vec![PENDING.to_string()],
                solutions: vec![PENDING.to_string()],
                prevention: vec![PENDING.to_string()],
            }),
            status: pending(),
            extra: Map::new(),
        }
    }

    /// Check if this entry still awaits curation
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status.as_deref() == Some(PENDING)
    }

    /// Fill in regexes, prompts and analysis the curator left empty
    ///
    /// Curated values are never overwritten.
    pub fn apply_default_properties(&mut self) {
        if self.regexes.is_empty() {
            self.regexes = vec![default_regex_for(&self.test_item)];
        }
        if self.ai_prompt.is_none() {
            self.ai_prompt = Some(self.default_ai_prompt());
        }
        if self.analysis_suggest.is_none() {
            self.analysis_suggest = Some(self.default_analysis());
        }
    }

    fn summary(&self) -> String {
        format!(
            "Test group: {}, Key parts: {}, Test item: {}, Method: {}, Test detail information: {}.",
            self.test_group,
            self.key_parts,
            self.test_item,
            self.method.as_deref().unwrap_or_default(),
            self.detail_info.as_deref().unwrap_or_default(),
        )
    }

    /// Prompt templates built from the entry's own metadata
    #[must_use]
    pub fn default_ai_prompt(&self) -> AiPrompt {
        let summary = self.summary();
        AiPrompt {
            explanation: format!(
                "Using the following: {summary}\n\
                 Explain briefly what this test item checks,\n\
                 in about 50 words,\n\
                 formatted as Markdown."
            ),
            failure_analysis: format!(
                "Using the following: {summary}\n\
                 Analyze the failure log briefly and give:\n\
                 1. Possible failure causes\n\
                 2. Suggested solutions\n\
                 3. Preventive measures\n\
                 in about 150 words, without tables,\n\
                 using ordered or unordered lists,\n\
                 formatted as Markdown."
            ),
        }
    }

    /// Keyword-driven starter analysis from the detail information
    #[must_use]
    pub fn default_analysis(&self) -> AnalysisSuggestion {
        let detail = self
            .detail_info
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();
        let mut analysis = AnalysisSuggestion::default();

        if detail.contains("adb") {
            analysis
                .possible_causes
                .push("ADB connection problem or unresponsive device".to_string());
            analysis
                .solutions
                .push("Check the USB connection or restart the ADB server".to_string());
            analysis
                .prevention
                .push("Make sure device drivers are installed correctly".to_string());
        }
        if detail.contains("time") {
            analysis
                .possible_causes
                .push("Clock synchronization problem or timeout".to_string());
            analysis
                .solutions
                .push("Check network time sync or adjust the timeout".to_string());
        }
        if detail.contains("error") {
            analysis
                .possible_causes
                .push("System error or configuration problem".to_string());
            analysis
                .solutions
                .push("Read the detailed error log to locate the problem".to_string());
            analysis
                .prevention
                .push("Check system health regularly".to_string());
        }
        analysis
    }
}

/// Default regex for a template name: digit runs generalize to `\d+`
///
/// `AUDIO_14600_MIC2` becomes `.*AUDIO_\d+_MIC\d+.*`; an empty name matches
/// anything.
#[must_use]
pub fn default_regex_for(template: &str) -> String {
    let mut pattern = String::from(".*");
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            while chars.peek().is_some_and(char::is_ascii_digit) {
                chars.next();
            }
            pattern.push_str(&regex::escape(&literal));
            literal.clear();
            pattern.push_str(r"\d+");
        } else {
            literal.push(c);
        }
    }
    pattern.push_str(&regex::escape(&literal));
    if !template.is_empty() {
        pattern.push_str(".*");
    }
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn test_default_regex_generalizes_digits() {
        assert_eq!(default_regex_for("AUDIO_14600_MIC2"), r".*AUDIO_\d+_MIC\d+.*");
        assert_eq!(default_regex_for("VBAT"), ".*VBAT.*");
        assert_eq!(default_regex_for(""), ".*");
        assert_eq!(default_regex_for("3.3V"), r".*\d+\.\d+V.*");
    }

    #[test]
    fn test_placeholder_regex_is_escaped_literal() {
        let entry = PatternEntry::placeholder("MIC_CHECK(1)", &["line".to_string()]);
        assert_eq!(entry.regexes, vec![r".*MIC_CHECK\(1\).*"]);
        assert_eq!(entry.test_group, UNCLASSIFIED);
        assert_eq!(entry.key_parts, UNCLASSIFIED);
        assert!(entry.is_pending());
        assert_eq!(
            entry.analysis_suggest.expect("analysis").failure_logs,
            vec!["line"]
        );
    }

    #[test]
    fn test_json_field_names() {
        let entry = PatternEntry::placeholder("T1", &[]);
        let json = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(json["TEST ITEMS"], "T1");
        assert_eq!(json["Test Group"], UNCLASSIFIED);
        assert_eq!(json["List of Regular Expressions"][0], ".*T1.*");
        assert_eq!(json["AI Prompt"]["测试项解释"], PENDING);
        assert_eq!(json["analysis_suggest"]["预防措施"][0], PENDING);
        assert_eq!(json["Status"], PENDING);
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let json = r#"{
            "Test Group": "Audio",
            "Key parts": "Speaker",
            "TEST ITEMS": "AUDIO_ALERT",
            "Owner": null,
            "Station": "L2AR",
            "Cpk": 1.33,
            "List of Regular Expressions": ["^AUDIO_ALERT"]
        }"#;
        let entry: PatternEntry = serde_json::from_str(json).expect("entry");
        assert_eq!(entry.owner, None);
        assert_eq!(entry.extra["Station"], "L2AR");

        let back = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(back["Station"], "L2AR");
        assert_eq!(back["Cpk"], 1.33);
        assert!(back.get("AI Prompt").is_none());
    }

    #[test]
    fn test_apply_defaults_keeps_curated_values() {
        let mut entry = PatternEntry {
            test_item: "WIFI_RSSI_5G_CH36".to_string(),
            detail_info: Some("Read RSSI over ADB, error on timeout".to_string()),
            regexes: vec!["^WIFI_RSSI".to_string()],
            ..PatternEntry::default()
        };
        entry.apply_default_properties();

        assert_eq!(entry.regexes, vec!["^WIFI_RSSI"]);
        let prompt = entry.ai_prompt.expect("prompt");
        assert!(prompt.explanation.contains("Test item: WIFI_RSSI_5G_CH36"));
        let analysis = entry.analysis_suggest.expect("analysis");
        assert_eq!(analysis.possible_causes.len(), 3);
        assert_eq!(analysis.prevention.len(), 2);
    }

    #[test]
    fn test_apply_defaults_fills_missing_regex() {
        let mut entry = PatternEntry {
            test_item: "BT_TX_POWER_CH39".to_string(),
            ..PatternEntry::default()
        };
        entry.apply_default_properties();
        assert_eq!(entry.regexes, vec![r".*BT_TX_POWER_CH\d+.*"]);
    }
}
