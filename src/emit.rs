//! Rendering of the consolidated schema artifact

use crate::accumulator::{ConsolidatedSchema, TableRecord};
use crate::inserts::InsertFilter;
use crate::merge::merge_columns;
use chrono::{DateTime, Utc};
use std::fmt;

/// Tables pinned to the front of the artifact, in this relative order
pub const DEFAULT_PRIORITY_TABLES: &[&str] =
    &["users", "files", "folders", "shares", "roles", "permissions"];

pub const DEFAULT_TITLE: &str = "SyncSpace Database Schema";

/// Prefix of the only line that differs between runs over identical input
pub const GENERATED_PREFIX: &str = "-- Generated: ";

const RULE: &str = "-- ============================================";

/// Orders tables and renders the schema text
#[derive(Debug, Clone)]
pub struct SchemaEmitter {
    title: String,
    priority_tables: Vec<String>,
    insert_filter: InsertFilter,
}

impl Default for SchemaEmitter {
    fn default() -> Self {
        Self::new(
            DEFAULT_TITLE,
            DEFAULT_PRIORITY_TABLES.iter().copied(),
            InsertFilter::default(),
        )
    }
}

impl SchemaEmitter {
    pub fn new<I, S>(title: impl Into<String>, priority_tables: I, insert_filter: InsertFilter) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: title.into(),
            priority_tables: priority_tables.into_iter().map(Into::into).collect(),
            insert_filter,
        }
    }

    /// Priority tables that exist, in priority order, then every other table
    /// in discovery order
    pub fn order_tables<'a>(&self, tables: &'a [TableRecord]) -> Vec<&'a TableRecord> {
        let mut ordered: Vec<&TableRecord> = self
            .priority_tables
            .iter()
            .filter_map(|name| tables.iter().find(|t| &t.name == name))
            .collect();
        for table in tables {
            if !self.priority_tables.contains(&table.name) {
                ordered.push(table);
            }
        }
        ordered
    }

    /// Render the complete artifact
    pub fn render(&self, schema: &ConsolidatedSchema, generated_at: DateTime<Utc>) -> String {
        SchemaDocument {
            emitter: self,
            schema,
            generated_at,
        }
        .to_string()
    }
}

struct SchemaDocument<'a> {
    emitter: &'a SchemaEmitter,
    schema: &'a ConsolidatedSchema,
    generated_at: DateTime<Utc>,
}

impl fmt::Display for SchemaDocument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", RULE)?;
        writeln!(f, "-- {}", self.emitter.title)?;
        writeln!(f, "-- Consolidated from all migrations")?;
        writeln!(
            f,
            "{}{}",
            GENERATED_PREFIX,
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(f, "{}", RULE)?;
        writeln!(f)?;

        for table in self.emitter.order_tables(&self.schema.tables) {
            write_table(f, table)?;
        }

        let inserts = self.emitter.insert_filter.select(&self.schema.inserts);
        if !inserts.is_empty() {
            writeln!(f, "-- Default Data")?;
            writeln!(f)?;
            for insert in inserts {
                writeln!(f, "{}", insert)?;
                writeln!(f)?;
            }
        }

        Ok(())
    }
}

fn write_table(f: &mut fmt::Formatter<'_>, table: &TableRecord) -> fmt::Result {
    writeln!(f, "-- Table: {}", table.name)?;
    writeln!(f, "CREATE TABLE IF NOT EXISTS {} (", table.name)?;
    let lines = merge_columns(table);
    for (i, line) in lines.iter().enumerate() {
        let separator = if i + 1 < lines.len() { "," } else { "" };
        writeln!(f, "    {}{}", line, separator)?;
    }
    writeln!(f, ");")?;
    writeln!(f)?;

    for index in &table.indexes {
        writeln!(f, "{};", index)?;
    }
    if !table.indexes.is_empty() {
        writeln!(f)?;
    }

    Ok(())
}

/// The artifact with its generation timestamp line removed
pub fn without_timestamp(sql: &str) -> String {
    sql.lines()
        .filter(|line| !line.starts_with(GENERATED_PREFIX))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether two artifacts differ only in their generation timestamp
pub fn same_schema(left: &str, right: &str) -> bool {
    without_timestamp(left) == without_timestamp(right)
}
