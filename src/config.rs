//! Configuration parsing and validation.
//!
//! Profile Harvest is configured via a TOML file (default:
//! `config/harvest.toml`). The file names both databases, batch sizing,
//! the optional user input file, and where the output artifact goes.
//!
//! # Example
//!
//! ```toml
//! [primary]
//! url = "postgres://reader@profiles-db/solis"
//!
//! [secondary]
//! url = "postgres://reader@reference-db/gravity"
//!
//! [extract]
//! batch_size = 1000
//! default_user_limit = 1000
//! cache_lookups = false
//!
//! [input]
//! user_uuids_csv = "data/user_uuids.csv"
//! column = "user_uuid"
//!
//! [output]
//! path = "data/data.json"
//!
//! [payload]
//! separator = "_"
//! ```
//!
//! [`load_config`] rejects out-of-range values up front so a run never
//! starts with, say, a zero batch size.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Profile database that entity rows are read from.
    pub primary: DatabaseConfig,
    /// Reference database that foreign keys are resolved against.
    pub secondary: DatabaseConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub input: Option<InputConfig>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub payload: PayloadConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Postgres connection URL.
    pub url: String,
    /// Pool size. The pipeline uses connections serially, so 1 suffices.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    1
}
fn default_connect_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractConfig {
    /// Users per batch; bounds every `= any($1)` list.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// How many accounts to take when no input file is configured.
    #[serde(default = "default_user_limit")]
    pub default_user_limit: i64,
    /// Fetch each reference table once per run instead of once per use.
    #[serde(default)]
    pub cache_lookups: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            default_user_limit: default_user_limit(),
            cache_lookups: false,
        }
    }
}

fn default_batch_size() -> usize {
    1000
}
fn default_user_limit() -> i64 {
    1000
}

/// Tabular file listing the users to extract.
#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub user_uuids_csv: PathBuf,
    #[serde(default = "default_input_column")]
    pub column: String,
}

fn default_input_column() -> String {
    "user_uuid".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    /// File that one JSON array per batch is appended to.
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("data/data.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct PayloadConfig {
    /// Joins nested keys when documents are flattened.
    #[serde(default = "default_separator")]
    pub separator: String,
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            separator: default_separator(),
        }
    }
}

fn default_separator() -> String {
    "_".to_string()
}

impl Config {
    /// Configuration for commands that never open a database.
    pub fn minimal() -> Self {
        let unset = DatabaseConfig {
            url: String::new(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
        };
        Self {
            primary: unset.clone(),
            secondary: unset,
            extract: ExtractConfig::default(),
            input: None,
            output: OutputConfig::default(),
            payload: PayloadConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    for (name, db) in [("primary", &config.primary), ("secondary", &config.secondary)] {
        if !(db.url.starts_with("postgres://") || db.url.starts_with("postgresql://")) {
            bail!("{}.url must be a postgres:// connection URL", name);
        }
        if db.max_connections == 0 {
            bail!("{}.max_connections must be >= 1", name);
        }
    }

    if config.extract.batch_size == 0 {
        bail!("extract.batch_size must be > 0");
    }
    if config.extract.default_user_limit < 1 {
        bail!("extract.default_user_limit must be >= 1");
    }

    if let Some(input) = &config.input {
        if input.column.trim().is_empty() {
            bail!("input.column must not be empty");
        }
    }

    if config.payload.separator.is_empty() {
        bail!("payload.separator must not be empty");
    }

    Ok(())
}
