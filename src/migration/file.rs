//! Migration file discovery and loading

use crate::error::{ConsolidateError, Result};
use crate::extract::{extract_statements, Statement};
use std::fs;
use std::path::{Path, PathBuf};

/// One migration file, read fully into memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    /// Path the file was read from
    pub path: PathBuf,

    /// File name; the sort key that fixes fold order
    pub name: String,

    /// Raw SQL text
    pub content: String,
}

impl MigrationFile {
    /// Build a migration from in-memory text
    ///
    /// Useful for folding synthetic migration lists without touching disk.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: PathBuf::from(&name),
            name,
            content: content.into(),
        }
    }

    /// Read a migration file from disk
    pub fn read(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let content = fs::read_to_string(path).map_err(|source| ConsolidateError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            name,
            content,
        })
    }

    /// Statements recognised in this file, in fold order
    pub fn statements(&self) -> Vec<Statement> {
        extract_statements(&self.content)
    }
}

/// Discover all migration files in a directory
///
/// Scans `migrations_dir` (not recursively) for regular files with the given
/// extension, reads each one, and returns them sorted by file name. Callers
/// name files so that lexicographic order is chronological order, e.g.
/// `001_init.sql`, `002_add_email.sql`.
///
/// # Errors
///
/// Returns errors if:
/// - The directory doesn't exist or isn't a directory
/// - The directory or any matching file can't be read
pub fn discover_migrations(migrations_dir: &Path, extension: &str) -> Result<Vec<MigrationFile>> {
    if !migrations_dir.exists() {
        return Err(ConsolidateError::DirectoryNotFound(migrations_dir.to_path_buf()));
    }

    if !migrations_dir.is_dir() {
        return Err(ConsolidateError::NotADirectory(migrations_dir.to_path_buf()));
    }

    let read_dir_error = |source| ConsolidateError::ReadFailed {
        path: migrations_dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(migrations_dir).map_err(read_dir_error)? {
        let path = entry.map_err(read_dir_error)?.path();

        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some(extension) {
            continue;
        }

        paths.push(path);
    }

    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let migrations = paths
        .iter()
        .map(|path| MigrationFile::read(path))
        .collect::<Result<Vec<_>>>()?;

    log::debug!(
        "Discovered {} migration file(s) in {}",
        migrations.len(),
        migrations_dir.display()
    );

    Ok(migrations)
}
