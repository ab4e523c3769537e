//! End-to-end tests for the consolidation pipeline

use schemafold::emit::same_schema;
use schemafold::{CheckOutcome, ConsolidateConfig, ConsolidateError, Consolidator, OrphanPolicy};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_migrations(dir: &Path, files: &[(&str, &str)]) {
    fs::create_dir_all(dir).unwrap();
    for (name, content) in files {
        fs::write(dir.join(name), content).unwrap();
    }
}

fn consolidator_for(temp_dir: &TempDir) -> Consolidator {
    let config = ConsolidateConfig {
        migrations_dir: temp_dir.path().join("migrations"),
        output_file: temp_dir.path().join("out/schema/001_initial_schema.sql"),
        ..ConsolidateConfig::default()
    };
    Consolidator::new(config)
}

#[test]
fn test_users_scenario() {
    let temp_dir = TempDir::new().unwrap();
    write_migrations(
        &temp_dir.path().join("migrations"),
        &[
            (
                "001_init.sql",
                "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);",
            ),
            (
                "002_add.sql",
                "ALTER TABLE users ADD COLUMN email TEXT;\nCREATE INDEX idx_users_email ON users(email);",
            ),
        ],
    );

    let consolidator = consolidator_for(&temp_dir);
    let report = consolidator.run().unwrap();

    assert_eq!(report.table_count, 1);
    assert_eq!(report.files_processed, 2);
    assert_eq!(report.orphan_count, 0);

    // Parent directories are created on demand
    let sql = fs::read_to_string(&report.output_path).unwrap();
    assert_eq!(report.line_count, sql.lines().count());

    let block = "\
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    name TEXT,
    email TEXT
);

CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
";
    assert!(sql.contains(block), "unexpected output:\n{}", sql);
    assert_eq!(sql.matches("CREATE TABLE IF NOT EXISTS users").count(), 1);
    assert!(!sql.contains("CREATE UNIQUE INDEX"));
}

#[test]
fn test_unique_index_stays_unique() {
    let temp_dir = TempDir::new().unwrap();
    write_migrations(
        &temp_dir.path().join("migrations"),
        &[(
            "001_init.sql",
            "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT);\nCREATE UNIQUE INDEX idx_users_email ON users(email);",
        )],
    );

    let consolidation = consolidator_for(&temp_dir).generate().unwrap();
    assert!(consolidation
        .sql
        .contains("CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users(email);"));
}

#[test]
fn test_idempotent_apart_from_timestamp() {
    let temp_dir = TempDir::new().unwrap();
    write_migrations(
        &temp_dir.path().join("migrations"),
        &[
            ("001_init.sql", "CREATE TABLE widgets (id INT);\nCREATE TABLE users (id INT);"),
            ("002_more.sql", "ALTER TABLE widgets ADD COLUMN size INT;\nINSERT INTO users (id) VALUES (1);"),
        ],
    );

    let consolidator = consolidator_for(&temp_dir);
    let first = consolidator.generate().unwrap();
    let second = consolidator.generate().unwrap();
    assert!(same_schema(&first.sql, &second.sql));

    let differing: Vec<(&str, &str)> = first
        .sql
        .lines()
        .zip(second.sql.lines())
        .filter(|(a, b)| a != b)
        .collect();
    assert!(differing.iter().all(|(a, _)| a.starts_with("-- Generated: ")));
}

#[test]
fn test_column_union_across_files() {
    let temp_dir = TempDir::new().unwrap();
    write_migrations(
        &temp_dir.path().join("migrations"),
        &[
            ("001_init.sql", "CREATE TABLE files (id INT, path TEXT);"),
            ("002_size.sql", "ALTER TABLE files ADD COLUMN size INT;"),
            (
                "003_redeclare.sql",
                "CREATE TABLE IF NOT EXISTS files (id INT, path TEXT, size INT, hash TEXT);\nALTER TABLE files ADD COLUMN owner INT;",
            ),
            ("004_again.sql", "ALTER TABLE files ADD COLUMN SIZE BIGINT;\nALTER TABLE files ADD COLUMN owner INT;"),
        ],
    );

    let consolidation = consolidator_for(&temp_dir).generate().unwrap();
    let expected = "\
CREATE TABLE IF NOT EXISTS files (
    id INT,
    path TEXT,
    size INT,
    hash TEXT,
    owner INT
);
";
    assert!(consolidation.sql.contains(expected), "unexpected output:\n{}", consolidation.sql);
}

#[test]
fn test_identical_index_across_files_emitted_once() {
    let temp_dir = TempDir::new().unwrap();
    write_migrations(
        &temp_dir.path().join("migrations"),
        &[
            ("001_init.sql", "CREATE TABLE t (a INT);\nCREATE INDEX idx_x ON t(a);"),
            ("002_repeat.sql", "CREATE INDEX idx_x ON t(a);"),
            ("003_other_name.sql", "CREATE INDEX idx_y ON t(a);"),
        ],
    );

    let sql = consolidator_for(&temp_dir).generate().unwrap().sql;
    assert_eq!(sql.matches("CREATE INDEX IF NOT EXISTS idx_x ON t(a);").count(), 1);
    assert_eq!(sql.matches("CREATE INDEX IF NOT EXISTS idx_y ON t(a);").count(), 1);
}

#[test]
fn test_priority_tables_precede_discovered_tables() {
    let temp_dir = TempDir::new().unwrap();
    write_migrations(
        &temp_dir.path().join("migrations"),
        &[
            ("001_widgets.sql", "CREATE TABLE widgets (id INT);"),
            ("002_users.sql", "CREATE TABLE users (id INT);"),
        ],
    );

    let sql = consolidator_for(&temp_dir).generate().unwrap().sql;
    let users = sql.find("-- Table: users").unwrap();
    let widgets = sql.find("-- Table: widgets").unwrap();
    assert!(users < widgets);
}

#[test]
fn test_insert_filtering() {
    let temp_dir = TempDir::new().unwrap();
    write_migrations(
        &temp_dir.path().join("migrations"),
        &[
            ("001_init.sql", "CREATE TABLE roles (id INT, name TEXT);\nCREATE TABLE sessions (id TEXT);"),
            (
                "002_seed.sql",
                "INSERT INTO sessions (id) VALUES ('abc');\nINSERT OR IGNORE INTO roles (id, name) VALUES (1, 'admin');",
            ),
            ("003_seed_again.sql", "INSERT OR IGNORE INTO roles (id, name) VALUES (1, 'admin');"),
        ],
    );

    let sql = consolidator_for(&temp_dir).generate().unwrap().sql;
    assert!(sql.contains("-- Default Data"));
    assert!(!sql.contains("INSERT INTO sessions"));
    assert_eq!(
        sql.matches("INSERT OR IGNORE INTO roles (id, name) VALUES (1, 'admin');").count(),
        1
    );
}

#[test]
fn test_alter_before_create_policies() {
    let files: &[(&str, &str)] = &[
        ("001_alter.sql", "ALTER TABLE notes ADD COLUMN body TEXT;"),
        ("002_create.sql", "CREATE TABLE notes (id INT);"),
    ];

    let temp_dir = TempDir::new().unwrap();
    write_migrations(&temp_dir.path().join("migrations"), files);

    let deferred = consolidator_for(&temp_dir).generate().unwrap();
    assert!(deferred.sql.contains("    body TEXT\n"));
    assert!(deferred.schema.orphans.is_empty());

    let config = ConsolidateConfig {
        orphan_policy: OrphanPolicy::Drop,
        ..consolidator_for(&temp_dir).config().clone()
    };
    let dropped = Consolidator::new(config).generate().unwrap();
    assert!(!dropped.sql.contains("body TEXT"));
    assert_eq!(dropped.schema.orphans.len(), 1);
}

#[test]
fn test_unmatched_statements_are_skipped() {
    let temp_dir = TempDir::new().unwrap();
    write_migrations(
        &temp_dir.path().join("migrations"),
        &[(
            "001_init.sql",
            "CREATE TABLE broken (id INT)\nCREATE TABLE ok (id INT);\nDROP TABLE legacy;\nUPDATE users SET name = 'x';",
        )],
    );

    let consolidation = consolidator_for(&temp_dir).generate().unwrap();
    let names: Vec<&str> = consolidation
        .schema
        .tables
        .iter()
        .map(|t| t.name.as_str())
        .collect();
    assert_eq!(names, vec!["ok"]);
}

#[test]
fn test_missing_migrations_directory_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let consolidator = consolidator_for(&temp_dir);
    assert!(matches!(
        consolidator.run(),
        Err(ConsolidateError::DirectoryNotFound(_))
    ));
    assert!(!consolidator.config().output_file.exists());
}

#[test]
fn test_check_outcomes() {
    let temp_dir = TempDir::new().unwrap();
    let migrations = temp_dir.path().join("migrations");
    write_migrations(&migrations, &[("001_init.sql", "CREATE TABLE users (id INT);")]);

    let consolidator = consolidator_for(&temp_dir);
    assert_eq!(consolidator.check().unwrap(), CheckOutcome::Missing);

    consolidator.run().unwrap();
    assert_eq!(consolidator.check().unwrap(), CheckOutcome::UpToDate);

    write_migrations(&migrations, &[("002_add.sql", "ALTER TABLE users ADD COLUMN name TEXT;")]);
    assert_eq!(consolidator.check().unwrap(), CheckOutcome::Stale);
}

#[test]
fn test_run_overwrites_previous_output() {
    let temp_dir = TempDir::new().unwrap();
    let migrations = temp_dir.path().join("migrations");
    write_migrations(&migrations, &[("001_init.sql", "CREATE TABLE users (id INT);")]);

    let consolidator = consolidator_for(&temp_dir);
    consolidator.run().unwrap();
    write_migrations(&migrations, &[("002_more.sql", "CREATE TABLE audit (id INT);")]);
    let report = consolidator.run().unwrap();

    let sql = fs::read_to_string(&report.output_path).unwrap();
    assert_eq!(report.table_count, 2);
    assert!(sql.contains("-- Table: audit"));
}
