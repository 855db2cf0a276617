//! In-memory associative store of field type trees.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arena::{TreeArena, TreeId};
use crate::revision::Revision;
use crate::tree::FieldTypeTree;

/// Numeric identifier of a class within the container format.
pub type ClassId = i32;

/// Key of a stored tree.
///
/// Ordered by class id, then revision string; this is also the order in which
/// entries are written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DatabaseKey {
    pub class_id: ClassId,
    pub revision: Revision,
}

impl DatabaseKey {
    pub fn new(class_id: ClassId, revision: impl Into<Revision>) -> Self {
        Self {
            class_id,
            revision: revision.into(),
        }
    }
}

impl fmt::Display for DatabaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.class_id, self.revision)
    }
}

/// Result of folding one map into another.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Entries imported because their key was missing
    pub added: usize,
    /// Keys present in both maps with structurally different trees
    pub conflicts: usize,
}

/// Map from `(class id, revision)` to field type tree.
///
/// Trees live in a [`TreeArena`], so keys sharing a layout share one tree. The
/// arena only holds trees that some key references: replacing the last key of a
/// tree compacts it away.
#[derive(Debug, Clone, Default)]
pub struct TypeTreeMap {
    arena: TreeArena,
    entries: BTreeMap<DatabaseKey, TreeId>,
}

impl TypeTreeMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the tree for `(class_id, revision)`.
    pub fn add(&mut self, class_id: ClassId, revision: impl Into<Revision>, tree: FieldTypeTree) {
        let id = self.arena.intern(tree);
        let replaced = self.entries.insert(DatabaseKey::new(class_id, revision), id);
        if let Some(old) = replaced {
            if old != id && !self.entries.values().any(|&v| v == old) {
                self.compact();
            }
        }
    }

    // Rebuilds the arena from the referenced trees, in key order.
    fn compact(&mut self) {
        let old = std::mem::take(&mut self.arena);
        let mut remap: HashMap<TreeId, TreeId> = HashMap::new();
        for id in self.entries.values_mut() {
            if let Some(&new_id) = remap.get(id) {
                *id = new_id;
            } else if let Some(tree) = old.get(*id) {
                let new_id = self.arena.intern(tree.clone());
                remap.insert(*id, new_id);
                *id = new_id;
            }
        }
    }

    /// Number of structurally distinct trees held.
    pub fn tree_count(&self) -> usize {
        self.arena.len()
    }

    /// Looks up a tree.
    ///
    /// With `strict`, only an exact key match is returned. Otherwise the lookup
    /// falls back, within the same class id, to the nearest prior revision in
    /// version order, and failing that to the nearest following revision.
    pub fn get(&self, class_id: ClassId, revision: &Revision, strict: bool) -> Option<&FieldTypeTree> {
        let key = DatabaseKey {
            class_id,
            revision: revision.clone(),
        };
        if let Some(&id) = self.entries.get(&key) {
            return self.arena.get(id);
        }
        if strict {
            return None;
        }
        let (_, id) = self.nearest(class_id, revision)?;
        self.arena.get(id)
    }

    /// Key that a non-strict lookup for `(class_id, revision)` resolves to.
    pub fn resolve_key(&self, class_id: ClassId, revision: &Revision) -> Option<&DatabaseKey> {
        let exact = DatabaseKey {
            class_id,
            revision: revision.clone(),
        };
        if let Some((key, _)) = self.entries.get_key_value(&exact) {
            return Some(key);
        }
        self.nearest(class_id, revision).map(|(key, _)| key)
    }

    fn nearest(&self, class_id: ClassId, revision: &Revision) -> Option<(&DatabaseKey, TreeId)> {
        let mut prior: Option<(&DatabaseKey, TreeId)> = None;
        let mut following: Option<(&DatabaseKey, TreeId)> = None;

        for (key, &id) in self.class_entries(class_id) {
            if key.revision.version_cmp(revision).is_le() {
                if prior.map_or(true, |(best, _)| key.revision.version_cmp(&best.revision).is_gt()) {
                    prior = Some((key, id));
                }
            } else if following
                .map_or(true, |(best, _)| key.revision.version_cmp(&best.revision).is_lt())
            {
                following = Some((key, id));
            }
        }

        prior.or(following)
    }

    fn class_entries(&self, class_id: ClassId) -> impl Iterator<Item = (&DatabaseKey, &TreeId)> {
        let start = DatabaseKey::new(class_id, "");
        self.entries
            .range(start..)
            .take_while(move |(key, _)| key.class_id == class_id)
    }

    /// Checks if an exact entry exists.
    pub fn contains(&self, class_id: ClassId, revision: &Revision) -> bool {
        self.get(class_id, revision, true).is_some()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All `(key, tree)` pairs in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&DatabaseKey, &FieldTypeTree)> {
        self.entries
            .iter()
            .filter_map(move |(key, &id)| self.arena.get(id).map(|tree| (key, tree)))
    }

    /// Trees referenced by at least one key, each structurally distinct tree once.
    pub fn values(&self) -> Vec<&FieldTypeTree> {
        let referenced: BTreeSet<TreeId> = self.entries.values().copied().collect();
        referenced
            .into_iter()
            .filter_map(|id| self.arena.get(id))
            .collect()
    }

    /// Distinct class ids in ascending order.
    pub fn class_ids(&self) -> BTreeSet<ClassId> {
        self.entries.keys().map(|key| key.class_id).collect()
    }

    /// Distinct revisions in string order.
    pub fn revisions(&self) -> BTreeSet<&Revision> {
        self.entries.keys().map(|key| &key.revision).collect()
    }

    /// Imports every entry of `other` whose key is missing here.
    ///
    /// Existing entries are never replaced; keys whose trees disagree are logged
    /// and counted as conflicts.
    pub fn merge_missing(&mut self, other: &TypeTreeMap) -> MergeStats {
        let mut stats = MergeStats::default();
        for (key, tree) in other.entries() {
            if let Some(existing) = self.get(key.class_id, &key.revision, true) {
                if existing != tree {
                    tracing::warn!(
                        "Database conflict for {}: {} != {}, keeping existing entry",
                        key,
                        tree.fingerprint(),
                        existing.fingerprint()
                    );
                    stats.conflicts += 1;
                }
                continue;
            }
            self.add(key.class_id, key.revision.clone(), tree.clone());
            stats.added += 1;
        }
        stats
    }
}
