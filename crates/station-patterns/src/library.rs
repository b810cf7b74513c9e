// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! The pattern library document
//!
//! On disk a library is a JSON object keyed by test group, each value an
//! object keyed by key-parts category, each value an array of entries:
//!
//! ```json
//! { "Audio": { "Speaker": [ { "TEST ITEMS": "...", "List of Regular Expressions": ["..."] } ] } }
//! ```
//!
//! Key order is significant: matching walks groups, categories and entries
//! in document order. [`PatternLibrary`] keeps that order in memory and
//! writes it back unchanged.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::entry::PatternEntry;
use crate::error::PatternError;

/// Entries sharing one key-parts name within a group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternCategory {
    pub name: String,
    pub entries: Vec<PatternEntry>,
}

/// Categories sharing one test-group name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternGroup {
    pub name: String,
    pub categories: Vec<PatternCategory>,
}

impl PatternGroup {
    fn category_mut(&mut self, name: &str) -> &mut PatternCategory {
        let index = match self.categories.iter().position(|c| c.name == name) {
            Some(index) => index,
            None => {
                self.categories.push(PatternCategory {
                    name: name.to_string(),
                    entries: Vec::new(),
                });
                self.categories.len() - 1
            }
        };
        &mut self.categories[index]
    }
}

/// An ordered, two-level library of pattern entries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternLibrary {
    groups: Vec<PatternGroup>,
}

/// An entry together with where it lives in the library
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryRef<'a> {
    pub test_group: &'a str,
    pub key_parts: &'a str,
    pub entry: &'a PatternEntry,
}

impl PatternLibrary {
    /// Create an empty library
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups in document order
    #[must_use]
    pub fn groups(&self) -> &[PatternGroup] {
        &self.groups
    }

    /// Every entry in matching order
    pub fn entries(&self) -> impl Iterator<Item = EntryRef<'_>> {
        self.groups.iter().flat_map(|group| {
            group.categories.iter().flat_map(move |category| {
                category.entries.iter().map(move |entry| EntryRef {
                    test_group: &group.name,
                    key_parts: &category.name,
                    entry,
                })
            })
        })
    }

    /// Total number of entries
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|g| &g.categories)
            .map(|c| c.entries.len())
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }

    /// Check if any entry uses `name` as its test-item template
    #[must_use]
    pub fn contains_template(&self, name: &str) -> bool {
        self.entries().any(|e| e.entry.test_item == name)
    }

    /// Append an entry under the group and category named by the given keys
    ///
    /// Missing groups and categories are created at the end, so existing
    /// entries keep their matching priority.
    pub fn add_entry(&mut self, test_group: &str, key_parts: &str, entry: PatternEntry) {
        self.group_mut(test_group)
            .category_mut(key_parts)
            .entries
            .push(entry);
    }

    fn group_mut(&mut self, name: &str) -> &mut PatternGroup {
        let index = match self.groups.iter().position(|g| g.name == name) {
            Some(index) => index,
            None => {
                self.groups.push(PatternGroup {
                    name: name.to_string(),
                    categories: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        &mut self.groups[index]
    }

    /// Build a library from a flat entry list, as produced by spreadsheet
    /// ingestion
    ///
    /// Entries are grouped by their own `Test Group` and `Key parts` fields;
    /// blank values fall back to `Unknown` and `None`. First appearance
    /// decides group and category order.
    #[must_use]
    pub fn group_entries(entries: impl IntoIterator<Item = PatternEntry>) -> Self {
        let mut library = Self::new();
        for entry in entries {
            let group = non_blank_or(&entry.test_group, "Unknown").to_string();
            let category = non_blank_or(&entry.key_parts, "None").to_string();
            library.add_entry(&group, &category, entry);
        }
        library
    }

    /// Fill default regexes, prompts and analysis on every entry
    pub fn apply_default_properties(&mut self) {
        for entry in self
            .groups
            .iter_mut()
            .flat_map(|g| &mut g.categories)
            .flat_map(|c| &mut c.entries)
        {
            entry.apply_default_properties();
        }
    }

    /// Parse a library document
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::InvalidLibrary`] if the text is not a library.
    pub fn from_json(json: &str) -> Result<Self, PatternError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render the library as pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, PatternError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn non_blank_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

// ============================================================================
// Serde: ordered nested maps
// ============================================================================

struct CategoriesSer<'a>(&'a [PatternCategory]);

impl Serialize for CategoriesSer<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for category in self.0 {
            map.serialize_entry(&category.name, &category.entries)?;
        }
        map.end()
    }
}

impl Serialize for PatternLibrary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for group in &self.groups {
            map.serialize_entry(&group.name, &CategoriesSer(&group.categories))?;
        }
        map.end()
    }
}

struct CategoriesDe(Vec<PatternCategory>);

impl<'de> Deserialize<'de> for CategoriesDe {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CategoriesVisitor;

        impl<'de> Visitor<'de> for CategoriesVisitor {
            type Value = CategoriesDe;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an object mapping key parts to entry arrays")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut group = PatternGroup::default();
                while let Some((name, entries)) = map.next_entry::<String, Vec<PatternEntry>>()? {
                    group.category_mut(&name).entries.extend(entries);
                }
                Ok(CategoriesDe(group.categories))
            }
        }

        deserializer.deserialize_map(CategoriesVisitor)
    }
}

impl<'de> Deserialize<'de> for PatternLibrary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LibraryVisitor;

        impl<'de> Visitor<'de> for LibraryVisitor {
            type Value = PatternLibrary;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an object mapping test groups to key-parts objects")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut library = PatternLibrary::new();
                while let Some((name, CategoriesDe(categories))) =
                    map.next_entry::<String, CategoriesDe>()?
                {
                    let group = library.group_mut(&name);
                    for category in categories {
                        group
                            .category_mut(&category.name)
                            .entries
                            .extend(category.entries);
                    }
                }
                Ok(library)
            }
        }

        deserializer.deserialize_map(LibraryVisitor)
    }
}
