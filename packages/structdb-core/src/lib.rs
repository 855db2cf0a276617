//! Struct database for serialized asset containers.
//!
//! Remembers the field type trees observed per class id and engine revision, learns
//! new ones from containers that embed them and fills them back into containers
//! that were written without. The whole store persists as a single deduplicated
//! binary file.

pub mod arena;
pub mod config;
pub mod container;
pub mod database;
pub mod engine;
pub mod error;
pub mod map;
pub mod persistence;
pub mod revision;
pub mod tree;

pub use config::DbConfig;
pub use container::{ClassNameResolver, ClassNameTable, Container, MemoryContainer};
pub use database::{SharedStructDatabase, StructDatabase};
pub use engine::{LearnOutcome, LearnSkip};
pub use error::StructDbError;
pub use map::{ClassId, DatabaseKey, MergeStats, TypeTreeMap};
pub use revision::Revision;
pub use tree::{FieldTypeTree, Fingerprint};
