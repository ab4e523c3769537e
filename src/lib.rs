//! # schemafold
//!
//! Folds an ordered history of incremental SQL migration files into a single
//! idempotent schema definition.
//!
//! The pipeline is one forward pass:
//!
//! 1. [`extract`] pulls table creations, column additions, indexes and
//!    inserts out of each file with balanced-delimiter scanning ([`scan`]).
//! 2. [`accumulator`] folds them, in file name order, into one record per
//!    table.
//! 3. [`merge`] reconciles each table's latest body with its added columns,
//!    and [`inserts`] selects the seed data worth keeping.
//! 4. [`emit`] orders the tables and renders the artifact.
//!
//! [`Consolidator`] runs the whole thing against a migrations directory.
//!
//! ```rust,no_run
//! use schemafold::{ConsolidateConfig, Consolidator};
//!
//! let report = Consolidator::new(ConsolidateConfig::default()).run()?;
//! println!("{} tables -> {}", report.table_count, report.output_path.display());
//! # Ok::<(), schemafold::ConsolidateError>(())
//! ```
//!
//! Extraction is pattern based, not a SQL parser. Statements that do not fit
//! a recognised shape are skipped silently, so consolidation is not
//! guaranteed to be lossless for unconventional SQL.

pub mod accumulator;
pub mod config;
pub mod consolidator;
pub mod emit;
pub mod error;
pub mod extract;
pub mod inserts;
pub mod merge;
pub mod migration;
pub mod references;
pub mod scan;

pub use accumulator::{ConsolidatedSchema, OrphanPolicy, TableAccumulator, TableRecord};
pub use crate::config::ConsolidateConfig;
pub use consolidator::{CheckOutcome, Consolidation, ConsolidationReport, Consolidator};
pub use emit::SchemaEmitter;
pub use error::{ConsolidateError, Result};
pub use extract::{extract_statements, Statement, StatementKind};
pub use migration::MigrationFile;
