//! Error types for the consolidation pipeline
//!
//! Only I/O and configuration problems are errors. Statements that do not
//! match a recognised shape are skipped, and duplicate or redeclared
//! definitions are resolved deterministically, so neither appears here.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a consolidation run
#[derive(Debug, Error)]
pub enum ConsolidateError {
    /// Migrations directory does not exist
    #[error("Migrations directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// Migrations path exists but is not a directory
    #[error("Path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// A directory or migration file could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The schema artifact could not be written
    #[error("Failed to write {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, ConsolidateError>;
