//! Configuration for a consolidation run.
//!
//! Settings come from an optional `config/schemafold.toml` (table
//! `[consolidate]`) layered with `SCHEMAFOLD__CONSOLIDATE__*` environment
//! variables. With neither present, [`ConsolidateConfig::default`] applies.

use crate::accumulator::OrphanPolicy;
use crate::emit::{DEFAULT_PRIORITY_TABLES, DEFAULT_TITLE};
use crate::error::Result;
use crate::inserts::DEFAULT_INSERT_KEYWORDS;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/schemafold.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConsolidateConfig {
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
    /// Migration file extension, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default = "default_priority_tables")]
    pub priority_tables: Vec<String>,
    #[serde(default = "default_insert_keywords")]
    pub insert_keywords: Vec<String>,
    /// Banner title of the generated artifact
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub orphan_policy: OrphanPolicy,
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_output_file() -> PathBuf {
    PathBuf::from("migrations_consolidated/001_initial_schema.sql")
}

fn default_extension() -> String {
    "sql".to_string()
}

fn default_priority_tables() -> Vec<String> {
    DEFAULT_PRIORITY_TABLES.iter().map(|t| t.to_string()).collect()
}

fn default_insert_keywords() -> Vec<String> {
    DEFAULT_INSERT_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

impl Default for ConsolidateConfig {
    fn default() -> Self {
        Self {
            migrations_dir: default_migrations_dir(),
            output_file: default_output_file(),
            extension: default_extension(),
            priority_tables: default_priority_tables(),
            insert_keywords: default_insert_keywords(),
            title: default_title(),
            orphan_policy: OrphanPolicy::default(),
        }
    }
}

fn environment() -> Environment {
    Environment::with_prefix("SCHEMAFOLD")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("consolidate.priority_tables")
        .with_list_parse_key("consolidate.insert_keywords")
}

impl ConsolidateConfig {
    /// Load from `config/schemafold.toml`, falling back to env vars.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Load from the given TOML file (optional), falling back to env vars.
    pub fn load_from(path: &Path) -> Result<Self> {
        let builder = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(environment());

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                // File present but unreadable or malformed: retry with env only
                if path.exists() {
                    log::warn!(
                        "Failed to load config file {}, falling back to env. Error: {}",
                        path.display(),
                        err
                    );
                }
                Config::builder()
                    .add_source(environment())
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {}, then env-only error: {}",
                            err, env_err
                        ))
                    })?
            }
        };

        match settings.get::<ConsolidateConfig>("consolidate") {
            Ok(config) => Ok(config),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(ConfigError::Message(format!(
                "Consolidation configuration could not be loaded from file or environment: {}",
                e
            ))
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConsolidateError;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_fixed_contract() {
        let config = ConsolidateConfig::default();
        assert_eq!(config.migrations_dir, PathBuf::from("migrations"));
        assert_eq!(
            config.output_file,
            PathBuf::from("migrations_consolidated/001_initial_schema.sql")
        );
        assert_eq!(config.extension, "sql");
        assert_eq!(
            config.priority_tables,
            vec!["users", "files", "folders", "shares", "roles", "permissions"]
        );
        assert_eq!(config.insert_keywords, vec!["users", "settings", "roles"]);
        assert_eq!(config.orphan_policy, OrphanPolicy::Defer);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConsolidateConfig::load_from(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ConsolidateConfig::default());
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("schemafold.toml");
        fs::write(
            &path,
            r#"
[consolidate]
migrations_dir = "db/migrations"
priority_tables = ["tenants", "users"]
orphan_policy = "drop"
"#,
        )
        .unwrap();

        let config = ConsolidateConfig::load_from(&path).unwrap();
        assert_eq!(config.migrations_dir, PathBuf::from("db/migrations"));
        assert_eq!(config.priority_tables, vec!["tenants", "users"]);
        assert_eq!(config.orphan_policy, OrphanPolicy::Drop);
        // Unset keys keep their defaults
        assert_eq!(config.extension, "sql");
        assert_eq!(config.title, DEFAULT_TITLE);
    }

    #[test]
    fn test_invalid_value_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("schemafold.toml");
        fs::write(&path, "[consolidate]\norphan_policy = \"sometimes\"\n").unwrap();

        let result = ConsolidateConfig::load_from(&path);
        assert!(matches!(result, Err(ConsolidateError::Config(_))));
    }
}
