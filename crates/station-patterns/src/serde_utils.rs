// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Lenient field deserializers
//!
//! Libraries are generated from spreadsheets, so a text column can arrive as
//! a string, a number, a boolean or `null`, and a list column as a single
//! string. These helpers normalize all of those instead of rejecting the
//! whole document.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn scalar_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Optional text; `null` becomes `None`, other scalars their JSON text
pub fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(scalar_to_text))
}

/// Required text; `null` becomes the empty string
pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

/// A list of strings, also accepting a single string or `null`
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.into_iter().filter_map(scalar_to_text).collect(),
        Some(other) => scalar_to_text(other).into_iter().collect(),
    })
}
