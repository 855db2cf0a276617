//! Field type trees: structural descriptors of a class's serialized layout.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StructDbError};
use crate::persistence::wire::{DataReader, DataWriter};

/// Maximum nesting depth accepted when decoding a tree record.
pub const MAX_TREE_DEPTH: usize = 64;

/// Smallest possible encoded tree record: two empty strings and six `i32`s.
pub(crate) const MIN_RECORD_SIZE: usize = 2 + 6 * 4;

/// Structural fingerprint of a [`FieldTypeTree`].
///
/// A CRC-32 over the canonical record encoding. It is a pure function of structural
/// content, so two trees describing the same layout always share a fingerprint;
/// equal fingerprints still require an equality check before trees are treated as one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(pub u32);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Node of a field type tree.
///
/// Equality is structural: every field and every child, in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldTypeTree {
    /// Type name (e.g. "GameObject", "int", "vector")
    pub type_name: String,
    /// Field name (e.g. "Base", "m_Name")
    pub field_name: String,
    /// Byte size, -1 for variable-sized fields
    pub size: i32,
    /// Position of the node in a depth-first walk of the tree
    pub index: i32,
    /// Array marker
    pub is_array: bool,
    /// Type version flags
    pub flags1: i32,
    /// Meta flags (alignment and similar)
    pub flags2: i32,
    /// Child fields in declaration order
    pub children: Vec<FieldTypeTree>,
}

impl FieldTypeTree {
    /// Creates a leaf node.
    pub fn new(type_name: impl Into<String>, field_name: impl Into<String>, size: i32) -> Self {
        Self {
            type_name: type_name.into(),
            field_name: field_name.into(),
            size,
            index: 0,
            is_array: false,
            flags1: 0,
            flags2: 0,
            children: Vec::new(),
        }
    }

    /// Appends a child and returns `self`, for building trees inline.
    pub fn with_child(mut self, child: FieldTypeTree) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes in the tree, including this one.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }

    /// Computes the structural fingerprint.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = crc32fast::Hasher::new();
        self.hash_record(&mut hasher);
        Fingerprint(hasher.finalize())
    }

    // Feeds the same bytes `write` would produce.
    fn hash_record(&self, hasher: &mut crc32fast::Hasher) {
        for name in [&self.type_name, &self.field_name] {
            hasher.update(name.as_bytes());
            hasher.update(&[0]);
        }
        let child_count = i32::try_from(self.children.len()).unwrap_or(i32::MAX);
        for value in [
            self.size,
            self.index,
            i32::from(self.is_array),
            self.flags1,
            self.flags2,
            child_count,
        ] {
            hasher.update(&value.to_be_bytes());
        }
        for child in &self.children {
            child.hash_record(hasher);
        }
    }

    /// Whether any node's type or field name contains a NUL byte, which the
    /// record format cannot represent.
    pub fn has_nul_name(&self) -> bool {
        self.type_name.contains('\0')
            || self.field_name.contains('\0')
            || self.children.iter().any(|c| c.has_nul_name())
    }

    /// Encodes the tree as a standalone record.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = DataWriter::new();
        self.write(&mut writer)?;
        Ok(writer.into_bytes())
    }

    /// Writes the tree record (depth-first, children after their parent).
    pub fn write(&self, out: &mut DataWriter) -> Result<()> {
        out.write_cstring(&self.type_name)?;
        out.write_cstring(&self.field_name)?;
        out.write_i32(self.size);
        out.write_i32(self.index);
        out.write_i32(i32::from(self.is_array));
        out.write_i32(self.flags1);
        out.write_i32(self.flags2);
        out.write_count("child", self.children.len())?;
        for child in &self.children {
            child.write(out)?;
        }
        Ok(())
    }

    /// Reads one tree record.
    pub fn read(input: &mut DataReader<'_>) -> Result<Self> {
        Self::read_at_depth(input, 0)
    }

    fn read_at_depth(input: &mut DataReader<'_>, depth: usize) -> Result<Self> {
        if depth >= MAX_TREE_DEPTH {
            return Err(StructDbError::MalformedRecord(format!(
                "tree nesting exceeds {} levels at offset {}",
                MAX_TREE_DEPTH,
                input.position()
            )));
        }

        let type_name = input.read_cstring()?;
        let field_name = input.read_cstring()?;
        let size = input.read_i32()?;
        let index = input.read_i32()?;
        let is_array = input.read_i32()? != 0;
        let flags1 = input.read_i32()?;
        let flags2 = input.read_i32()?;
        let child_count = input.read_count("child", MIN_RECORD_SIZE)?;

        let mut children = Vec::with_capacity(child_count);
        for _ in 0..child_count {
            children.push(Self::read_at_depth(input, depth + 1)?);
        }

        Ok(Self {
            type_name,
            field_name,
            size,
            index,
            is_array,
            flags1,
            flags2,
            children,
        })
    }
}
