//! Seed-data selection
//!
//! Only inserts that mention one of a small set of keywords survive
//! consolidation; everything else is treated as transient data that does not
//! belong in a clean-install schema.

use crate::extract::InsertRecord;
use std::collections::HashSet;

/// Keywords that mark an insert as worth keeping
pub const DEFAULT_INSERT_KEYWORDS: &[&str] = &["users", "settings", "roles"];

/// Deduplicates and selects insert statements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertFilter {
    keywords: Vec<String>,
}

impl Default for InsertFilter {
    fn default() -> Self {
        Self::new(DEFAULT_INSERT_KEYWORDS.iter().copied())
    }
}

impl InsertFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Whether the statement text contains any keyword, ignoring case
    pub fn matches(&self, sql: &str) -> bool {
        let lower = sql.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }

    /// Matching statements, first occurrence of each exact text only,
    /// in discovery order
    pub fn select<'a>(&self, inserts: &'a [InsertRecord]) -> Vec<&'a str> {
        let mut seen = HashSet::new();
        inserts
            .iter()
            .map(|insert| insert.sql.as_str())
            .filter(|sql| seen.insert(*sql))
            .filter(|sql| self.matches(sql))
            .collect()
    }
}
