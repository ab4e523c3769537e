//! Migration input for the consolidation pipeline
//!
//! Migration files are plain SQL scripts in a single directory, folded in
//! ascending file name order. Later files take precedence over earlier ones.

pub mod file;

pub use file::{discover_migrations, MigrationFile};
