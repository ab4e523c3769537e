//! Column merging for consolidated table definitions
//!
//! A table's final body is its latest creation body with every column added
//! later by `ALTER TABLE` folded in. Table-level constraints are moved after
//! all columns so that a `FOREIGN KEY` or `CHECK` never mentions a column
//! declared below it.

use crate::accumulator::TableRecord;
use crate::scan::{leading_identifier, split_top_level};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static CONSTRAINT_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:CONSTRAINT\s|FOREIGN\s+KEY\b|PRIMARY\s+KEY\s*\(|UNIQUE\s*\(|CHECK\s*\()")
        .expect("constraint pattern is valid")
});

/// One top-level fragment of a creation body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnLine {
    Column { name: String, text: String },
    Constraint(String),
}

impl ColumnLine {
    /// Classify a trimmed body fragment. Returns `None` for empty input.
    pub fn classify(fragment: &str) -> Option<Self> {
        let text = fragment.trim();
        if CONSTRAINT_PREFIX.is_match(text) {
            return Some(ColumnLine::Constraint(text.to_string()));
        }
        let name = leading_identifier(text)?;
        Some(ColumnLine::Column {
            name: name.to_string(),
            text: text.to_string(),
        })
    }
}

/// Final ordered body lines for a table, without indentation or commas.
///
/// Order: original columns, then added columns not already declared, then
/// constraints. Column names are compared ASCII case-insensitively and each
/// one appears once.
pub fn merge_columns(record: &TableRecord) -> Vec<String> {
    let mut columns = Vec::new();
    let mut constraints = Vec::new();
    let mut seen = HashSet::new();

    for fragment in split_top_level(&record.creation_body) {
        match ColumnLine::classify(fragment) {
            Some(ColumnLine::Column { name, text }) => {
                if seen.insert(name.to_ascii_lowercase()) {
                    columns.push(text);
                } else {
                    log::debug!("Column '{}.{}' declared twice; keeping first", record.name, name);
                }
            }
            Some(ColumnLine::Constraint(text)) => constraints.push(text),
            None => {}
        }
    }

    for added in &record.added_columns {
        if seen.insert(added.name.to_ascii_lowercase()) {
            columns.push(format!("{} {}", added.name, added.definition));
        }
    }

    columns.extend(constraints);
    columns
}
