//! Table accumulation across the ordered migration history
//!
//! The [`TableAccumulator`] folds extracted statements, file by file, into
//! one [`TableRecord`] per table name. It is an explicit value threaded
//! through the pipeline so a run over a synthetic file list is as easy to
//! test as a run over a directory.

use crate::extract::{IndexRecord, InsertRecord, Statement};
use crate::migration::MigrationFile;
use serde::Deserialize;
use std::collections::HashMap;

/// What to do with column additions and indexes whose table has not been
/// created yet when they are folded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrphanPolicy {
    /// Hold them back and attach them as soon as their table is created.
    #[default]
    Defer,
    /// Discard them as soon as they are seen.
    Drop,
}

/// A column added after creation by `ALTER TABLE ... ADD COLUMN`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedColumn {
    pub name: String,
    pub definition: String,
}

/// Everything known about one table after folding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRecord {
    pub name: String,
    /// Body of the most recent `CREATE TABLE` seen for this table
    pub creation_body: String,
    /// Added columns, in order of first appearance
    pub added_columns: Vec<AddedColumn>,
    /// Canonical index statements, deduplicated by exact text
    pub indexes: Vec<String>,
}

impl TableRecord {
    pub fn new(name: impl Into<String>, creation_body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            creation_body: creation_body.into(),
            added_columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Whether a column with this name was already added (ASCII case-insensitive)
    pub fn has_added_column(&self, column: &str) -> bool {
        self.added_columns
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case(column))
    }
}

/// Result of folding a whole migration history
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsolidatedSchema {
    /// Tables in first-discovery order
    pub tables: Vec<TableRecord>,
    /// Every insert seen, in discovery order, not yet deduplicated
    pub inserts: Vec<InsertRecord>,
    /// Column additions and indexes that never found their table
    pub orphans: Vec<Statement>,
}

impl ConsolidatedSchema {
    pub fn table(&self, name: &str) -> Option<&TableRecord> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// Folds statements into table records
#[derive(Debug, Default)]
pub struct TableAccumulator {
    tables: Vec<TableRecord>,
    positions: HashMap<String, usize>,
    inserts: Vec<InsertRecord>,
    deferred: Vec<Statement>,
    orphans: Vec<Statement>,
    policy: OrphanPolicy,
}

impl TableAccumulator {
    pub fn new(policy: OrphanPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Fold every statement of one migration file
    pub fn fold_file(&mut self, file: &MigrationFile) {
        log::info!("Processing: {}", file.name);
        for statement in file.statements() {
            self.fold(statement);
        }
    }

    /// Fold a single statement
    pub fn fold(&mut self, statement: Statement) {
        match statement {
            Statement::CreateTable { table, body } => self.create_table(table, body),
            Statement::Insert(insert) => self.inserts.push(insert),
            other => {
                if let Some(statement) = self.attach(other) {
                    self.orphan(statement);
                }
            }
        }
    }

    /// Finish the fold. Deferred statements still waiting here target
    /// tables that are never created.
    pub fn finish(mut self) -> ConsolidatedSchema {
        for statement in std::mem::take(&mut self.deferred) {
            log::warn!(
                "Dropping `{}`: table '{}' is never created",
                statement,
                statement.table()
            );
            self.orphans.push(statement);
        }

        ConsolidatedSchema {
            tables: self.tables,
            inserts: self.inserts,
            orphans: self.orphans,
        }
    }

    fn create_table(&mut self, table: String, body: String) {
        match self.positions.get(&table) {
            Some(&pos) => {
                log::debug!("Table '{}' redeclared; using latest definition", table);
                self.tables[pos].creation_body = body;
            }
            None => {
                log::debug!("Table '{}' discovered", table);
                self.positions.insert(table.clone(), self.tables.len());
                self.tables.push(TableRecord::new(table.clone(), body));
                self.replay_deferred(&table);
            }
        }
    }

    /// Attach statements deferred for `table`, in the order they were seen.
    fn replay_deferred(&mut self, table: &str) {
        let (ready, waiting): (Vec<Statement>, Vec<Statement>) =
            std::mem::take(&mut self.deferred)
                .into_iter()
                .partition(|s| s.table() == table);
        self.deferred = waiting;

        for statement in ready {
            log::debug!("Replaying deferred `{}`", statement);
            // The table exists now, so nothing is handed back.
            let _ = self.attach(statement);
        }
    }

    /// Apply a column addition or index to its table.
    ///
    /// Hands the statement back if the table is unknown.
    fn attach(&mut self, statement: Statement) -> Option<Statement> {
        let Some(&pos) = self.positions.get(statement.table()) else {
            return Some(statement);
        };
        let record = &mut self.tables[pos];

        match statement {
            Statement::AddColumn {
                column, definition, ..
            } => {
                if record.has_added_column(&column) {
                    log::debug!("Column '{}.{}' already added; ignoring", record.name, column);
                } else {
                    log::debug!("Column '{}.{}' added", record.name, column);
                    record.added_columns.push(AddedColumn {
                        name: column,
                        definition,
                    });
                }
            }
            Statement::CreateIndex(index) => add_index(record, &index),
            // Table creations and inserts never reach here.
            Statement::CreateTable { .. } | Statement::Insert(_) => {}
        }
        None
    }

    fn orphan(&mut self, statement: Statement) {
        match self.policy {
            OrphanPolicy::Defer => {
                log::debug!(
                    "Deferring `{}` until table '{}' is created",
                    statement,
                    statement.table()
                );
                self.deferred.push(statement);
            }
            OrphanPolicy::Drop => {
                log::warn!(
                    "Dropping `{}`: table '{}' has not been created yet",
                    statement,
                    statement.table()
                );
                self.orphans.push(statement);
            }
        }
    }
}

fn add_index(record: &mut TableRecord, index: &IndexRecord) {
    let sql = index.to_sql();
    if record.indexes.contains(&sql) {
        log::debug!("Index '{}' already present; ignoring duplicate", index.name);
    } else {
        log::debug!("Index '{}' added to '{}'", index.name, record.name);
        record.indexes.push(sql);
    }
}

/// Fold an ordered list of migration files into a schema
pub fn accumulate(files: &[MigrationFile], policy: OrphanPolicy) -> ConsolidatedSchema {
    let mut accumulator = TableAccumulator::new(policy);
    for file in files {
        accumulator.fold_file(file);
    }
    accumulator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_statements;

    fn fold_all(policy: OrphanPolicy, sources: &[&str]) -> ConsolidatedSchema {
        let mut accumulator = TableAccumulator::new(policy);
        for source in sources {
            for statement in extract_statements(source) {
                accumulator.fold(statement);
            }
        }
        accumulator.finish()
    }

    #[test]
    fn test_redeclared_table_keeps_latest_body_and_position() {
        let schema = fold_all(
            OrphanPolicy::Defer,
            &[
                "CREATE TABLE a (id INT);\nCREATE TABLE b (id INT);",
                "CREATE TABLE a (id INT, name TEXT);",
            ],
        );
        let names: Vec<&str> = schema.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(schema.tables[0].creation_body, "id INT, name TEXT");
    }

    #[test]
    fn test_added_columns_first_appearance_wins() {
        let schema = fold_all(
            OrphanPolicy::Defer,
            &[
                "CREATE TABLE a (id INT);\nALTER TABLE a ADD COLUMN x TEXT;",
                "ALTER TABLE a ADD COLUMN X INTEGER;\nALTER TABLE a ADD COLUMN y TEXT;",
            ],
        );
        let added = &schema.tables[0].added_columns;
        assert_eq!(added.len(), 2);
        assert_eq!(added[0].name, "x");
        assert_eq!(added[0].definition, "TEXT");
        assert_eq!(added[1].name, "y");
    }

    #[test]
    fn test_indexes_deduplicated_by_text() {
        let schema = fold_all(
            OrphanPolicy::Defer,
            &[
                "CREATE TABLE t (a INT);\nCREATE INDEX idx_x ON t(a);",
                "CREATE INDEX idx_x ON t(a);\nCREATE INDEX idx_y ON t(a);",
            ],
        );
        assert_eq!(
            schema.tables[0].indexes,
            vec![
                "CREATE INDEX IF NOT EXISTS idx_x ON t(a)".to_string(),
                "CREATE INDEX IF NOT EXISTS idx_y ON t(a)".to_string(),
            ]
        );
    }

    #[test]
    fn test_alter_before_create_deferred() {
        let schema = fold_all(
            OrphanPolicy::Defer,
            &[
                "ALTER TABLE late ADD COLUMN note TEXT;\nCREATE INDEX idx_late ON late(note);",
                "CREATE TABLE late (id INT);",
            ],
        );
        let late = schema.table("late").unwrap();
        assert_eq!(late.added_columns[0].name, "note");
        assert_eq!(late.indexes.len(), 1);
        assert!(schema.orphans.is_empty());
    }

    #[test]
    fn test_deferred_column_keeps_first_appearance() {
        let schema = fold_all(
            OrphanPolicy::Defer,
            &[
                "ALTER TABLE notes ADD COLUMN body TEXT;",
                "CREATE TABLE notes (id INT);\nALTER TABLE notes ADD COLUMN BODY INTEGER;\nALTER TABLE notes ADD COLUMN title TEXT;",
            ],
        );
        let added: Vec<(&str, &str)> = schema
            .table("notes")
            .unwrap()
            .added_columns
            .iter()
            .map(|c| (c.name.as_str(), c.definition.as_str()))
            .collect();
        assert_eq!(added, vec![("body", "TEXT"), ("title", "TEXT")]);
        assert!(schema.orphans.is_empty());
    }

    #[test]
    fn test_alter_before_create_dropped() {
        let schema = fold_all(
            OrphanPolicy::Drop,
            &[
                "ALTER TABLE late ADD COLUMN note TEXT;",
                "CREATE TABLE late (id INT);",
            ],
        );
        assert!(schema.table("late").unwrap().added_columns.is_empty());
        assert_eq!(schema.orphans.len(), 1);
    }

    #[test]
    fn test_alter_for_missing_table_reported() {
        let schema = fold_all(OrphanPolicy::Defer, &["ALTER TABLE ghost ADD COLUMN x TEXT;"]);
        assert!(schema.tables.is_empty());
        assert_eq!(schema.orphans.len(), 1);
        assert_eq!(schema.orphans[0].table(), "ghost");
    }

    #[test]
    fn test_inserts_collected_in_order() {
        let schema = fold_all(
            OrphanPolicy::Defer,
            &["INSERT INTO a VALUES (1);", "INSERT INTO b VALUES (2);"],
        );
        let tables: Vec<&str> = schema.inserts.iter().map(|i| i.table.as_str()).collect();
        assert_eq!(tables, vec!["a", "b"]);
    }
}
