//! Binary encoding of the whole struct database.
//!
//! Layout (all integers big-endian `i32`):
//!
//! ```text
//! version
//! tree table count,     tree records
//! revision table count, null-terminated strings
//! mapping count,        (tree index, class id, revision index) triples
//! ```

use std::collections::HashMap;

use crate::arena::TreeArena;
use crate::error::{Result, StructDbError};
use crate::map::{ClassId, TypeTreeMap};
use crate::revision::Revision;
use crate::tree::{FieldTypeTree, MIN_RECORD_SIZE};

use super::wire::{DataReader, DataWriter};

/// Database format version written to and expected in the header.
pub const FORMAT_VERSION: i32 = 1;

/// Size of one mapping triple on disk.
const MAPPING_ENTRY_SIZE: usize = 12;

/// One row of the mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingEntry {
    pub tree_index: i32,
    pub class_id: ClassId,
    pub revision_index: i32,
}

/// The three tables exactly as they appear in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseImage {
    pub trees: Vec<FieldTypeTree>,
    pub revisions: Vec<String>,
    pub mapping: Vec<MappingEntry>,
}

impl DatabaseImage {
    /// Builds deduplicated tables from a map.
    ///
    /// Entries are visited in key order and each tree and revision gets its index on
    /// first appearance, so identical maps always produce identical images.
    pub fn from_map(map: &TypeTreeMap) -> Self {
        let mut arena = TreeArena::new();
        let mut revisions = Vec::new();
        let mut revision_indices: HashMap<&Revision, i32> = HashMap::new();
        let mut mapping = Vec::with_capacity(map.len());

        for (key, tree) in map.entries() {
            let tree_index = match arena.find(tree) {
                Some(id) => id,
                None => arena.intern(tree.clone()),
            };
            let next = revisions.len() as i32;
            let revision_index = *revision_indices.entry(&key.revision).or_insert_with(|| {
                revisions.push(key.revision.as_str().to_string());
                next
            });
            mapping.push(MappingEntry {
                tree_index: tree_index.index() as i32,
                class_id: key.class_id,
                revision_index,
            });
        }

        Self {
            trees: arena.iter().cloned().collect(),
            revisions,
            mapping,
        }
    }

    /// Parses an image, validating the header version.
    pub fn read(bytes: &[u8]) -> Result<Self> {
        let mut input = DataReader::new(bytes);

        let version = input.read_i32()?;
        if version != FORMAT_VERSION {
            return Err(StructDbError::VersionMismatch {
                expected: FORMAT_VERSION,
                got: version,
            });
        }

        let tree_count = input.read_count("tree table", MIN_RECORD_SIZE)?;
        let mut trees = Vec::with_capacity(tree_count);
        for _ in 0..tree_count {
            trees.push(FieldTypeTree::read(&mut input)?);
        }

        let revision_count = input.read_count("revision table", 1)?;
        let mut revisions = Vec::with_capacity(revision_count);
        for _ in 0..revision_count {
            revisions.push(input.read_cstring()?);
        }

        let mapping_count = input.read_count("mapping", MAPPING_ENTRY_SIZE)?;
        let mut mapping = Vec::with_capacity(mapping_count);
        for _ in 0..mapping_count {
            mapping.push(MappingEntry {
                tree_index: input.read_i32()?,
                class_id: input.read_i32()?,
                revision_index: input.read_i32()?,
            });
        }

        if input.remaining() > 0 {
            tracing::debug!("Ignoring {} trailing bytes in struct database", input.remaining());
        }

        Ok(Self {
            trees,
            revisions,
            mapping,
        })
    }

    /// Serializes the image.
    ///
    /// Fails when a revision or tree name contains a NUL byte; such a value would
    /// be cut short on disk and collide with other entries on reload.
    pub fn write(&self) -> Result<Vec<u8>> {
        let mut out = DataWriter::new();
        out.write_i32(FORMAT_VERSION);

        out.write_count("tree table", self.trees.len())?;
        for tree in &self.trees {
            tree.write(&mut out)?;
        }

        out.write_count("revision table", self.revisions.len())?;
        for revision in &self.revisions {
            out.write_cstring(revision)?;
        }

        out.write_count("mapping", self.mapping.len())?;
        for entry in &self.mapping {
            out.write_i32(entry.tree_index);
            out.write_i32(entry.class_id);
            out.write_i32(entry.revision_index);
        }

        Ok(out.into_bytes())
    }

    /// Resolves the mapping table into a map. Fails on the first dangling index.
    pub fn into_map(self) -> Result<TypeTreeMap> {
        let mut map = TypeTreeMap::new();
        for entry in &self.mapping {
            let tree = lookup(&self.trees, entry.tree_index, "tree")?;
            let revision = lookup(&self.revisions, entry.revision_index, "revision")?;
            map.add(entry.class_id, revision.as_str(), tree.clone());
        }
        Ok(map)
    }
}

fn lookup<'a, T>(table: &'a [T], index: i32, name: &'static str) -> Result<&'a T> {
    usize::try_from(index)
        .ok()
        .and_then(|i| table.get(i))
        .ok_or(StructDbError::InvalidIndex {
            table: name,
            index,
            len: table.len(),
        })
}

/// Encodes a map into database file bytes.
pub fn encode(map: &TypeTreeMap) -> Result<Vec<u8>> {
    DatabaseImage::from_map(map).write()
}

/// Decodes database file bytes into a map. No partial map is returned on failure.
pub fn decode(bytes: &[u8]) -> Result<TypeTreeMap> {
    DatabaseImage::read(bytes)?.into_map()
}
