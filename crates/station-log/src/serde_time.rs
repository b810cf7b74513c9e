// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Serde helpers for station timestamps
//!
//! Blocks serialize their times in the log's own `YYYY-MM-DD HH:MM:SS,mmm`
//! layout so that output JSON reads like the source and reloads unchanged.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serializer};

use crate::line::{format_timestamp, parse_timestamp};

/// Serialize an optional timestamp as station text or `null`
pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(ts) => serializer.serialize_str(&format_timestamp(ts)),
        None => serializer.serialize_none(),
    }
}

/// Deserialize an optional timestamp; text that is not a station timestamp
/// becomes `None` rather than an error
pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = Option::<String>::deserialize(deserializer)?;
    Ok(text.as_deref().and_then(parse_timestamp))
}
