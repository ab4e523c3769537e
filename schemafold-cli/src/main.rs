//! schemafold CLI Tool
//!
//! Command-line interface for consolidating a directory of incremental SQL
//! migrations into a single idempotent schema file. Suitable for local use
//! and for CI pipelines (`schemafold check` fails when the artifact is stale).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use schemafold::consolidator::{CheckOutcome, ConsolidationReport};
use schemafold::{ConsolidateConfig, Consolidator, StatementKind};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "schemafold")]
#[command(about = "Consolidate incremental SQL migrations into one idempotent schema")]
#[command(version)]
struct Cli {
    /// Configuration file (default: config/schemafold.toml, optional)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Migrations directory path
    #[arg(long, global = true)]
    migrations_dir: Option<PathBuf>,

    /// Output schema file path
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Consolidate migrations and write the schema file (default)
    Consolidate {
        /// Print the schema to stdout instead of writing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Fail if the schema file is missing or out of date
    Check,

    /// List migration files in fold order with statement counts
    List,
}

fn main() {
    let cli = Cli::parse();

    // .env may carry RUST_LOG as well as SCHEMAFOLD__* settings
    dotenv::dotenv().ok();

    // Initialize logging
    logger(&cli, env_logger::Env::default()).init();

    match run(&cli) {
        Ok(true) => process::exit(0),
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("{} {:#}", "❌ Error:".red().bold(), e);
            process::exit(1);
        }
    }
}

/// Logger honouring the filter variable of `env`, defaulting by verbosity
fn logger(cli: &Cli, env: env_logger::Env<'_>) -> env_logger::Builder {
    let default_filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env.default_filter_or(default_filter))
}

/// Execute the selected command. `Ok(false)` means "completed, but failed
/// the check".
fn run(cli: &Cli) -> Result<bool> {
    let config = load_config(cli)?;
    let consolidator = Consolidator::new(config);

    match cli.command.as_ref().unwrap_or(&Commands::Consolidate { dry_run: false }) {
        Commands::Consolidate { dry_run } => handle_consolidate(&consolidator, *dry_run, cli.quiet),
        Commands::Check => handle_check(&consolidator, cli.quiet),
        Commands::List => handle_list(&consolidator),
    }
}

fn load_config(cli: &Cli) -> Result<ConsolidateConfig> {
    let mut config = match &cli.config {
        Some(path) => ConsolidateConfig::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ConsolidateConfig::load().context("Failed to load configuration")?,
    };

    if let Some(dir) = &cli.migrations_dir {
        config.migrations_dir = dir.clone();
    }
    if let Some(output) = &cli.output {
        config.output_file = output.clone();
    }

    log::debug!("Using configuration: {:?}", config);
    Ok(config)
}

fn handle_consolidate(consolidator: &Consolidator, dry_run: bool, quiet: bool) -> Result<bool> {
    let migrations_dir = &consolidator.config().migrations_dir;
    if !quiet && !dry_run {
        println!("🔄 Consolidating migrations from {}...", migrations_dir.display());
    }

    let consolidation = consolidator
        .generate()
        .with_context(|| format!("Failed to consolidate {}", migrations_dir.display()))?;

    if dry_run {
        print!("{}", consolidation.sql);
        return Ok(true);
    }

    let report = consolidator.write(&consolidation)?;
    if !quiet {
        print_summary(&report);
    }

    Ok(true)
}

fn print_summary(report: &ConsolidationReport) {
    println!("📊 Found {} tables", report.table_count);
    println!("✅ Written to {}", report.output_path.display());
    println!("📝 Total lines: {}", report.line_count);

    if report.orphan_count > 0 {
        println!(
            "{} {} column addition(s) or index(es) target tables that are never created",
            "⚠️ ".yellow(),
            report.orphan_count
        );
    }
    for issue in &report.reference_issues {
        println!("{} {}", "⚠️ ".yellow(), issue);
    }
}

fn handle_check(consolidator: &Consolidator, quiet: bool) -> Result<bool> {
    let output = &consolidator.config().output_file;
    let outcome = consolidator.check()?;

    if !quiet {
        match outcome {
            CheckOutcome::UpToDate => {
                println!("{} {} is up to date", "✅".green(), output.display())
            }
            CheckOutcome::Stale => println!(
                "{} {} is out of date; run `schemafold consolidate`",
                "❌".red(),
                output.display()
            ),
            CheckOutcome::Missing => println!(
                "{} {} does not exist; run `schemafold consolidate`",
                "❌".red(),
                output.display()
            ),
        }
    }

    Ok(outcome == CheckOutcome::UpToDate)
}

fn handle_list(consolidator: &Consolidator) -> Result<bool> {
    let migrations = consolidator.discover_migrations()?;

    println!("\n📋 Migrations ({}):\n", migrations.len());
    for migration in &migrations {
        let statements = migration.statements();
        let counts: Vec<String> = StatementKind::ALL
            .iter()
            .map(|kind| {
                let count = statements.iter().filter(|s| s.kind() == *kind).count();
                format!("{} {}", count, kind)
            })
            .collect();
        println!("  {} ({})", migration.name.bold(), counts.join(", "));
    }

    Ok(true)
}
