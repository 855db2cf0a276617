//! Struct database error types.

use thiserror::Error;

/// Struct database errors.
///
/// Load failures are absorbed by [`StructDatabase::open`](crate::database::StructDatabase::open),
/// which degrades to an empty store; the variants still surface through the lower-level
/// codec and persistence APIs.
#[derive(Error, Debug, Clone)]
pub enum StructDbError {
    /// Database file not present at any of the searched locations
    #[error("Struct database file not found (searched: {searched})")]
    NotFound { searched: String },

    /// Header version differs from the supported format version
    #[error("Wrong database version: expected {expected}, got {got}")]
    VersionMismatch { expected: i32, got: i32 },

    /// Structural decode failure in the database stream
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// Mapping entry references a table slot that does not exist
    #[error("Invalid {table} index {index} (table size {len})")]
    InvalidIndex {
        table: &'static str,
        index: i32,
        len: usize,
    },

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Lock poisoned (Mutex poisoned)
    #[error("Lock poisoned")]
    LockPoisoned,

    /// Disk full error during persistence
    #[error("Disk full: {0}")]
    DiskFull(String),

    /// I/O error during persistence
    #[error("I/O error: {0}")]
    IoError(String),

    /// Transient I/O error that may succeed on retry
    #[error("Transient I/O error: {0}")]
    TransientIoError(String),
}

/// Result alias for struct database operations.
pub type Result<T> = std::result::Result<T, StructDbError>;
