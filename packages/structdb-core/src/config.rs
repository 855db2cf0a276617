//! Database configuration.
//!
//! Supports TOML config files, environment variable overrides, and defaults.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StructDbError};

/// File name of the struct database.
pub const DB_FILENAME: &str = "structdb.dat";

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// User-level database file, read first and always written on save
    pub db_path: PathBuf,
    /// Bundled database read when `db_path` does not exist
    pub fallback_path: Option<PathBuf>,
    /// Maximum retry attempts for transient I/O errors
    pub persistence_max_retries: u32,
    /// Delay between retry attempts in milliseconds
    pub persistence_retry_delay_ms: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DB_FILENAME),
            fallback_path: bundled_resource_path(),
            persistence_max_retries: 3,      // Default retry attempts
            persistence_retry_delay_ms: 100, // 100ms delay between retries
        }
    }
}

impl DbConfig {
    /// Creates a configuration reading and writing a single file, with no fallback.
    pub fn with_db_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: path.into(),
            fallback_path: None,
            ..Default::default()
        }
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| StructDbError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| StructDbError::Config(format!("Invalid TOML: {}", e)))
    }

    /// Applies environment variable overrides.
    ///
    /// Variables are prefixed with `STRUCTDB_`, e.g. `STRUCTDB_PATH=/tmp/structdb.dat`
    /// overrides `db_path`. An empty `STRUCTDB_FALLBACK_PATH` disables the fallback.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = env::var("STRUCTDB_PATH") {
            self.db_path = PathBuf::from(val);
        }
        if let Ok(val) = env::var("STRUCTDB_FALLBACK_PATH") {
            self.fallback_path = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }
        if let Ok(val) = env::var("STRUCTDB_MAX_RETRIES") {
            self.persistence_max_retries = val
                .parse()
                .map_err(|_| StructDbError::Config(format!("Invalid max retries: {}", val)))?;
        }
        if let Ok(val) = env::var("STRUCTDB_RETRY_DELAY_MS") {
            self.persistence_retry_delay_ms = val
                .parse()
                .map_err(|_| StructDbError::Config(format!("Invalid retry delay: {}", val)))?;
        }
        Ok(())
    }
}

/// `resources/structdb.dat` next to the running executable.
fn bundled_resource_path() -> Option<PathBuf> {
    let exe = env::current_exe().ok()?;
    Some(exe.parent()?.join("resources").join(DB_FILENAME))
}
