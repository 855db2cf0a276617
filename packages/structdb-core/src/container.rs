//! Collaborator contracts: the parsed container file and the class-name table.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::map::ClassId;
use crate::revision::Revision;
use crate::tree::FieldTypeTree;

/// Parsed container file as seen by the struct database.
///
/// Implemented by the container parser; the database only reads the revision and
/// class ids and reads or writes the per-class type trees.
pub trait Container {
    /// Engine revision declared by the file, absent in old formats.
    fn revision(&self) -> Option<&Revision>;

    /// Whether the file's type trees come from the database rather than its own bytes.
    fn is_externally_sourced(&self) -> bool;

    /// Marks the type trees as database-sourced so they are not written back into the file.
    fn set_externally_sourced(&mut self, value: bool);

    /// Class ids of the objects stored in the file.
    fn class_ids(&self) -> BTreeSet<ClassId>;

    /// Type tree embedded for `class_id`, if any.
    fn metadata(&self, class_id: ClassId) -> Option<&FieldTypeTree>;

    /// Sets the type tree for `class_id`.
    fn put_metadata(&mut self, class_id: ClassId, tree: FieldTypeTree);
}

/// Maps class ids to display names. Only used for diagnostics.
pub trait ClassNameResolver {
    fn resolve(&self, class_id: ClassId) -> Option<&str>;
}

/// Resolver that knows no names.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClassNames;

impl ClassNameResolver for NoClassNames {
    fn resolve(&self, _class_id: ClassId) -> Option<&str> {
        None
    }
}

/// Table-backed [`ClassNameResolver`].
#[derive(Debug, Clone, Default)]
pub struct ClassNameTable {
    names: HashMap<ClassId, String>,
}

impl ClassNameTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table pre-filled with the most common engine classes.
    pub fn with_common_names() -> Self {
        [
            (1, "GameObject"),
            (4, "Transform"),
            (21, "Material"),
            (23, "MeshRenderer"),
            (28, "Texture2D"),
            (33, "MeshFilter"),
            (43, "Mesh"),
            (48, "Shader"),
            (49, "TextAsset"),
            (74, "AnimationClip"),
            (83, "AudioClip"),
            (114, "MonoBehaviour"),
            (115, "MonoScript"),
            (128, "Font"),
            (142, "AssetBundle"),
            (213, "Sprite"),
        ]
        .into_iter()
        .collect()
    }

    /// Adds or replaces a name.
    pub fn insert(&mut self, class_id: ClassId, name: impl Into<String>) {
        self.names.insert(class_id, name.into());
    }
}

impl<S: Into<String>> FromIterator<(ClassId, S)> for ClassNameTable {
    fn from_iter<I: IntoIterator<Item = (ClassId, S)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (class_id, name) in iter {
            table.insert(class_id, name);
        }
        table
    }
}

impl ClassNameResolver for ClassNameTable {
    fn resolve(&self, class_id: ClassId) -> Option<&str> {
        self.names.get(&class_id).map(String::as_str)
    }
}

/// In-memory [`Container`], for hosts that parse files elsewhere and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    revision: Option<Revision>,
    externally_sourced: bool,
    class_ids: BTreeSet<ClassId>,
    trees: BTreeMap<ClassId, FieldTypeTree>,
}

impl MemoryContainer {
    /// Creates a container with the given revision and no classes.
    pub fn new(revision: Option<Revision>) -> Self {
        Self {
            revision,
            ..Default::default()
        }
    }

    /// Adds a class that has an embedded type tree.
    pub fn with_tree(mut self, class_id: ClassId, tree: FieldTypeTree) -> Self {
        self.class_ids.insert(class_id);
        self.trees.insert(class_id, tree);
        self
    }

    /// Adds a class without an embedded type tree.
    pub fn with_class(mut self, class_id: ClassId) -> Self {
        self.class_ids.insert(class_id);
        self
    }

    /// Sets the externally-sourced flag.
    pub fn externally_sourced(mut self, value: bool) -> Self {
        self.externally_sourced = value;
        self
    }
}

impl Container for MemoryContainer {
    fn revision(&self) -> Option<&Revision> {
        self.revision.as_ref()
    }

    fn is_externally_sourced(&self) -> bool {
        self.externally_sourced
    }

    fn set_externally_sourced(&mut self, value: bool) {
        self.externally_sourced = value;
    }

    fn class_ids(&self) -> BTreeSet<ClassId> {
        self.class_ids.clone()
    }

    fn metadata(&self, class_id: ClassId) -> Option<&FieldTypeTree> {
        self.trees.get(&class_id)
    }

    fn put_metadata(&mut self, class_id: ClassId, tree: FieldTypeTree) {
        self.class_ids.insert(class_id);
        self.trees.insert(class_id, tree);
    }
}
