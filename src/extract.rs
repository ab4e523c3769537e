//! Statement extraction from raw migration text
//!
//! Four statement shapes are recognised: table creation, column addition,
//! index creation and data insertion. Each shape is located by a regex that
//! anchors on its leading keywords; the extent of the statement is then found
//! with the balanced-delimiter scanner in [`crate::scan`].
//!
//! Anything that does not fit one of the shapes exactly is skipped without
//! error. That is a fidelity limit of pattern extraction, not a failure.

use crate::scan::{find_terminator, matching_paren, strip_comments};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static CREATE_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bCREATE\s+TABLE(?:\s+IF\s+NOT\s+EXISTS)?\s+(\w+)\s*\(")
        .expect("CREATE TABLE pattern is valid")
});

static ADD_COLUMN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bALTER\s+TABLE\s+(\w+)\s+ADD\s+COLUMN\s+(?:IF\s+NOT\s+EXISTS\s+)?(\w+)\s+")
        .expect("ADD COLUMN pattern is valid")
});

static CREATE_INDEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bCREATE\s+(UNIQUE\s+)?INDEX(?:\s+IF\s+NOT\s+EXISTS)?\s+(\w+)\s+ON\s+(\w+)\s*\(")
        .expect("CREATE INDEX pattern is valid")
});

static INSERT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bINSERT\s+(?:OR\s+(?:IGNORE|REPLACE)\s+)?INTO\s+(\w+)")
        .expect("INSERT pattern is valid")
});

/// An index declaration found in a migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    pub name: String,
    pub table: String,
    /// Column list exactly as written between the parentheses
    pub columns: String,
    pub unique: bool,
}

impl IndexRecord {
    /// Canonical idempotent form, without the trailing semicolon
    ///
    /// Two records are the same index for deduplication purposes only if
    /// this text is identical.
    pub fn to_sql(&self) -> String {
        format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {}({})",
            if self.unique { "UNIQUE " } else { "" },
            self.name,
            self.table,
            self.columns
        )
    }
}

/// A seed-data statement, kept verbatim including its terminating `;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertRecord {
    pub table: String,
    pub sql: String,
}

/// One extracted statement fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    CreateTable {
        table: String,
        /// Raw text between the outer parentheses
        body: String,
    },
    AddColumn {
        table: String,
        column: String,
        definition: String,
    },
    CreateIndex(IndexRecord),
    Insert(InsertRecord),
}

/// Statement shape, used for counting and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatementKind {
    CreateTable,
    AddColumn,
    CreateIndex,
    Insert,
}

impl StatementKind {
    pub const ALL: [StatementKind; 4] = [
        StatementKind::CreateTable,
        StatementKind::AddColumn,
        StatementKind::CreateIndex,
        StatementKind::Insert,
    ];
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatementKind::CreateTable => "create table",
            StatementKind::AddColumn => "add column",
            StatementKind::CreateIndex => "create index",
            StatementKind::Insert => "insert",
        };
        f.write_str(label)
    }
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::CreateTable { .. } => StatementKind::CreateTable,
            Statement::AddColumn { .. } => StatementKind::AddColumn,
            Statement::CreateIndex(_) => StatementKind::CreateIndex,
            Statement::Insert(_) => StatementKind::Insert,
        }
    }

    /// Name of the table the statement targets
    pub fn table(&self) -> &str {
        match self {
            Statement::CreateTable { table, .. } | Statement::AddColumn { table, .. } => table,
            Statement::CreateIndex(index) => &index.table,
            Statement::Insert(insert) => &insert.table,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::CreateTable { table, .. } => write!(f, "CREATE TABLE {}", table),
            Statement::AddColumn { table, column, .. } => {
                write!(f, "ALTER TABLE {} ADD COLUMN {}", table, column)
            }
            Statement::CreateIndex(index) => write!(f, "{}", index.to_sql()),
            Statement::Insert(insert) => write!(f, "INSERT INTO {}", insert.table),
        }
    }
}

/// Extract every recognised statement from one migration file's text.
///
/// Comments are stripped first. The result is in fold order: all table
/// creations, then column additions, then indexes, then inserts, each group
/// in source order. Folding creations first lets an `ALTER TABLE` in the
/// same file attach to a table declared further down.
pub fn extract_statements(text: &str) -> Vec<Statement> {
    let text = strip_comments(text);

    let mut statements = extract_create_tables(&text);
    statements.extend(extract_add_columns(&text));
    statements.extend(extract_indexes(&text));
    statements.extend(extract_inserts(&text));
    statements
}

/// `CREATE TABLE [IF NOT EXISTS] name ( body );`
///
/// The closing parenthesis is the one that balances the opening one, and the
/// `;` must follow it immediately.
pub fn extract_create_tables(text: &str) -> Vec<Statement> {
    CREATE_TABLE
        .captures_iter(text)
        .filter_map(|caps| {
            let head = caps.get(0)?;
            let open = head.end() - 1;
            let close = matching_paren(text, open)?;
            if !text[close + 1..].starts_with(';') {
                return None;
            }
            Some(Statement::CreateTable {
                table: caps[1].to_string(),
                body: text[open + 1..close].trim().to_string(),
            })
        })
        .collect()
}

/// `ALTER TABLE name ADD COLUMN col definition;`
pub fn extract_add_columns(text: &str) -> Vec<Statement> {
    ADD_COLUMN
        .captures_iter(text)
        .filter_map(|caps| {
            let head = caps.get(0)?;
            let end = find_terminator(text, head.end())?;
            let definition = text[head.end()..end].trim();
            if definition.is_empty() {
                return None;
            }
            Some(Statement::AddColumn {
                table: caps[1].to_string(),
                column: caps[2].to_string(),
                definition: definition.to_string(),
            })
        })
        .collect()
}

/// `CREATE [UNIQUE] INDEX [IF NOT EXISTS] name ON table ( columns );`
pub fn extract_indexes(text: &str) -> Vec<Statement> {
    CREATE_INDEX
        .captures_iter(text)
        .filter_map(|caps| {
            let head = caps.get(0)?;
            let open = head.end() - 1;
            let close = matching_paren(text, open)?;
            if !text[close + 1..].starts_with(';') {
                return None;
            }
            let columns = &text[open + 1..close];
            if columns.trim().is_empty() {
                return None;
            }
            Some(Statement::CreateIndex(IndexRecord {
                name: caps[2].to_string(),
                table: caps[3].to_string(),
                columns: columns.to_string(),
                unique: caps.get(1).is_some(),
            }))
        })
        .collect()
}

/// `INSERT [OR IGNORE|OR REPLACE] INTO table ... ;`, captured verbatim
pub fn extract_inserts(text: &str) -> Vec<Statement> {
    INSERT
        .captures_iter(text)
        .filter_map(|caps| {
            let head = caps.get(0)?;
            let end = find_terminator(text, head.end())?;
            if text[head.end()..end].trim().is_empty() {
                return None;
            }
            Some(Statement::Insert(InsertRecord {
                table: caps[1].to_string(),
                sql: text[head.start()..=end].to_string(),
            }))
        })
        .collect()
}
