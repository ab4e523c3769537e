//! Consolidator - the consolidation pipeline driver
//!
//! Discovers migration files, folds them into a [`ConsolidatedSchema`],
//! renders the schema artifact and writes it. The whole run is a single
//! forward pass; nothing persists between runs.

use crate::accumulator::{accumulate, ConsolidatedSchema};
use crate::config::ConsolidateConfig;
use crate::emit::{same_schema, SchemaEmitter};
use crate::error::{ConsolidateError, Result};
use crate::inserts::InsertFilter;
use crate::merge::merge_columns;
use crate::migration::{discover_migrations, MigrationFile};
use crate::references::{check_references, extract_references, ReferenceIssue, TableReferences};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// An in-memory consolidation result, not yet written
#[derive(Debug, Clone)]
pub struct Consolidation {
    pub schema: ConsolidatedSchema,
    /// Rendered artifact text
    pub sql: String,
    pub files_processed: usize,
    pub reference_issues: Vec<ReferenceIssue>,
}

impl Consolidation {
    pub fn table_count(&self) -> usize {
        self.schema.tables.len()
    }

    pub fn line_count(&self) -> usize {
        self.sql.lines().count()
    }
}

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct ConsolidationReport {
    pub table_count: usize,
    pub output_path: PathBuf,
    pub line_count: usize,
    pub files_processed: usize,
    pub orphan_count: usize,
    pub reference_issues: Vec<ReferenceIssue>,
}

/// Outcome of comparing the existing artifact with a fresh consolidation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    UpToDate,
    Stale,
    Missing,
}

/// Drives discovery, folding, rendering and output
pub struct Consolidator {
    config: ConsolidateConfig,
    emitter: SchemaEmitter,
}

impl Consolidator {
    pub fn new(config: ConsolidateConfig) -> Self {
        let emitter = SchemaEmitter::new(
            config.title.clone(),
            config.priority_tables.iter().cloned(),
            InsertFilter::new(&config.insert_keywords),
        );
        Self { config, emitter }
    }

    pub fn config(&self) -> &ConsolidateConfig {
        &self.config
    }

    /// Migration files in fold order
    pub fn discover_migrations(&self) -> Result<Vec<MigrationFile>> {
        discover_migrations(&self.config.migrations_dir, &self.config.extension)
    }

    /// Fold, render and diagnose an explicit list of migration files
    ///
    /// Files are folded in the order given.
    pub fn consolidate_files(
        &self,
        files: &[MigrationFile],
        generated_at: DateTime<Utc>,
    ) -> Consolidation {
        let schema = accumulate(files, self.config.orphan_policy);
        let sql = self.emitter.render(&schema, generated_at);
        let reference_issues = self.reference_issues(&schema);

        Consolidation {
            schema,
            sql,
            files_processed: files.len(),
            reference_issues,
        }
    }

    /// Consolidate the configured migrations directory in memory
    pub fn generate(&self) -> Result<Consolidation> {
        let files = self.discover_migrations()?;
        Ok(self.consolidate_files(&files, Utc::now()))
    }

    /// Consolidate and write the artifact
    pub fn run(&self) -> Result<ConsolidationReport> {
        let consolidation = self.generate()?;
        self.write(&consolidation)
    }

    /// Write a consolidation to the configured output file
    ///
    /// The parent directory is created if needed. The text goes to a
    /// temporary file beside the target which is then renamed over it, so
    /// a failed write never leaves a partial artifact.
    pub fn write(&self, consolidation: &Consolidation) -> Result<ConsolidationReport> {
        let output = &self.config.output_file;
        write_atomic(output, &consolidation.sql).map_err(|source| ConsolidateError::WriteFailed {
            path: output.clone(),
            source,
        })?;

        log::info!(
            "Wrote {} table(s) to {}",
            consolidation.table_count(),
            output.display()
        );

        Ok(ConsolidationReport {
            table_count: consolidation.table_count(),
            output_path: output.clone(),
            line_count: consolidation.line_count(),
            files_processed: consolidation.files_processed,
            orphan_count: consolidation.schema.orphans.len(),
            reference_issues: consolidation.reference_issues.clone(),
        })
    }

    /// Compare the existing artifact with what a run would write now
    pub fn check(&self) -> Result<CheckOutcome> {
        let fresh = self.generate()?;
        let output = &self.config.output_file;

        let existing = match fs::read_to_string(output) {
            Ok(existing) => existing,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CheckOutcome::Missing),
            Err(source) => {
                return Err(ConsolidateError::ReadFailed {
                    path: output.clone(),
                    source,
                })
            }
        };

        if same_schema(&existing, &fresh.sql) {
            Ok(CheckOutcome::UpToDate)
        } else {
            Ok(CheckOutcome::Stale)
        }
    }

    fn reference_issues(&self, schema: &ConsolidatedSchema) -> Vec<ReferenceIssue> {
        let tables: Vec<TableReferences> = self
            .emitter
            .order_tables(&schema.tables)
            .into_iter()
            .map(|table| TableReferences {
                name: table.name.clone(),
                references: extract_references(&merge_columns(table)),
            })
            .collect();

        let issues = check_references(&tables);
        for issue in &issues {
            log::warn!("{}", issue);
        }
        issues
    }
}

fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(contents.as_bytes())?;
    temp.flush()?;
    // Temp files are created owner-only; the artifact keeps the mode of the
    // file it replaces, or gets a regular file mode when new.
    let permissions = match fs::metadata(path) {
        Ok(metadata) => metadata.permissions(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => new_file_permissions(temp.as_file())?,
        Err(e) => return Err(e),
    };
    temp.as_file().set_permissions(permissions)?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(unix)]
fn new_file_permissions(_temp: &fs::File) -> io::Result<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Ok(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions(temp: &fs::File) -> io::Result<fs::Permissions> {
    temp.metadata().map(|metadata| metadata.permissions())
}
