//! Foreign key reference diagnostics
//!
//! This module provides functionality to:
//! - Extract the tables a merged table body references
//! - Report references to tables that are missing from the schema
//! - Report references to tables emitted after the referencing table
//!
//! Emission order is never changed here; the findings are warnings only.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

static REFERENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bREFERENCES\s+((?:\w+\.)?\w+)").expect("REFERENCES pattern is valid")
});

/// Extract the referenced table name from a foreign key target
///
/// Handles "table(column)", "schema.table(column)" and a bare "table".
pub fn extract_foreign_key_table(target: &str) -> String {
    let table_ref = match target.find('(') {
        Some(paren_pos) => target[..paren_pos].trim(),
        None => target.trim(),
    };
    match table_ref.rfind('.') {
        Some(dot_pos) => table_ref[dot_pos + 1..].to_string(),
        None => table_ref.to_string(),
    }
}

/// Every table referenced from the given body lines, first occurrence only
pub fn extract_references<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let mut references: Vec<String> = Vec::new();
    for line in lines {
        for caps in REFERENCES.captures_iter(line.as_ref()) {
            let table = extract_foreign_key_table(&caps[1]);
            if !references.contains(&table) {
                references.push(table);
            }
        }
    }
    references
}

/// A table and the tables it references, in emission order
#[derive(Debug, Clone)]
pub struct TableReferences {
    pub name: String,
    pub references: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceIssueKind {
    /// Referenced table is not part of the consolidated schema
    Missing,
    /// Referenced table is emitted after the referencing one
    Forward,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceIssue {
    pub table: String,
    pub referenced: String,
    pub kind: ReferenceIssueKind,
}

impl fmt::Display for ReferenceIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ReferenceIssueKind::Missing => write!(
                f,
                "Table '{}' references '{}' which does not exist in the consolidated schema",
                self.table, self.referenced
            ),
            ReferenceIssueKind::Forward => write!(
                f,
                "Table '{}' references '{}' which is created later in the consolidated schema",
                self.table, self.referenced
            ),
        }
    }
}

/// Check references against emission order
///
/// Self-references are allowed.
pub fn check_references(tables: &[TableReferences]) -> Vec<ReferenceIssue> {
    let positions: HashMap<&str, usize> = tables
        .iter()
        .enumerate()
        .map(|(i, t)| (t.name.as_str(), i))
        .collect();

    let mut issues = Vec::new();
    for (pos, table) in tables.iter().enumerate() {
        for referenced in &table.references {
            let kind = match positions.get(referenced.as_str()) {
                None => ReferenceIssueKind::Missing,
                Some(&target) if target > pos => ReferenceIssueKind::Forward,
                Some(_) => continue,
            };
            issues.push(ReferenceIssue {
                table: table.name.clone(),
                referenced: referenced.clone(),
                kind,
            });
        }
    }

    issues
}
