//! Database file location, load and atomic save.

pub mod codec;
pub mod io_utils;
pub mod wire;


use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::config::DbConfig;
use crate::error::{Result, StructDbError};
use crate::map::TypeTreeMap;

use self::io_utils::RetryPolicy;

pub use self::codec::{decode, encode, DatabaseImage, MappingEntry, FORMAT_VERSION};

/// Reads and decodes a database file.
pub fn read_map(path: &Path) -> Result<TypeTreeMap> {
    read_with(path, &RetryPolicy::NONE)
}

/// Encodes `map` and writes it to `path` through a temporary file and rename.
pub fn write_map(path: &Path, map: &TypeTreeMap) -> Result<()> {
    write_atomic(path, &encode(map)?, &RetryPolicy::NONE)
}

fn read_with(path: &Path, retry: &RetryPolicy) -> Result<TypeTreeMap> {
    let bytes = retry.run("read", path, || fs::read(path))?;
    decode(&bytes)
}

fn write_atomic(path: &Path, bytes: &[u8], retry: &RetryPolicy) -> Result<()> {
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        retry.run("create directory", parent, || fs::create_dir_all(parent))?;
    }

    let result = retry
        .run("write", &temp_path, || {
            let mut file = File::create(&temp_path)?;
            file.write_all(bytes)?;
            file.sync_all()
        })
        .and_then(|()| retry.run("rename", &temp_path, || fs::rename(&temp_path, path)));

    if result.is_err() {
        if let Err(e) = fs::remove_file(&temp_path) {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!("Can't remove {}: {}", temp_path.display(), e);
            }
        }
    }
    result
}

/// Loads and saves the struct database according to a [`DbConfig`].
#[derive(Debug, Clone)]
pub struct PersistenceManager {
    /// Database file written on save, read first on load
    db_path: PathBuf,
    /// Bundled database read when `db_path` is absent
    fallback_path: Option<PathBuf>,
    /// Repetition of transient filesystem failures
    retry: RetryPolicy,
}

impl PersistenceManager {
    /// Creates a new persistence manager with the given configuration.
    pub fn new(config: &DbConfig) -> Self {
        Self {
            db_path: config.db_path.clone(),
            fallback_path: config.fallback_path.clone(),
            retry: RetryPolicy::from_config(config),
        }
    }

    /// Path written by [`save`](Self::save).
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// First existing database file: the user-level file, then the bundled one.
    pub fn locate(&self) -> Result<PathBuf> {
        let candidates = std::iter::once(&self.db_path).chain(self.fallback_path.iter());
        for path in candidates.clone() {
            if path.is_file() {
                return Ok(path.clone());
            }
        }
        Err(StructDbError::NotFound {
            searched: candidates
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// Locates and decodes the database.
    pub fn load(&self) -> Result<(TypeTreeMap, PathBuf)> {
        let path = self.locate()?;
        let map = read_with(&path, &self.retry)?;
        Ok((map, path))
    }

    /// Writes the whole map to the user-level database file.
    pub fn save(&self, map: &TypeTreeMap) -> Result<()> {
        let bytes = encode(map)?;
        write_atomic(&self.db_path, &bytes, &self.retry)
    }
}
