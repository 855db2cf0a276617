//! Content-addressed storage for field type trees.

use std::collections::HashMap;

use crate::tree::{FieldTypeTree, Fingerprint};

/// Index of a tree inside a [`TreeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeId(pub(crate) usize);

impl TreeId {
    /// Position of the tree in the arena, which is also its table index when encoding.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Append-only arena holding each structurally distinct tree once.
///
/// Trees are bucketed by [`Fingerprint`]; a bucket hit is confirmed with structural
/// equality, so fingerprint collisions never merge different trees.
#[derive(Debug, Clone, Default)]
pub struct TreeArena {
    trees: Vec<FieldTypeTree>,
    by_fingerprint: HashMap<Fingerprint, Vec<TreeId>>,
}

impl TreeArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `tree` unless a structurally equal tree is already present.
    /// Returns the id of the stored tree.
    pub fn intern(&mut self, tree: FieldTypeTree) -> TreeId {
        let fingerprint = tree.fingerprint();
        if let Some(id) = self.find_with(fingerprint, &tree) {
            return id;
        }
        let id = TreeId(self.trees.len());
        self.trees.push(tree);
        self.by_fingerprint.entry(fingerprint).or_default().push(id);
        id
    }

    /// Looks up a structurally equal tree.
    pub fn find(&self, tree: &FieldTypeTree) -> Option<TreeId> {
        self.find_with(tree.fingerprint(), tree)
    }

    fn find_with(&self, fingerprint: Fingerprint, tree: &FieldTypeTree) -> Option<TreeId> {
        self.by_fingerprint
            .get(&fingerprint)?
            .iter()
            .copied()
            .find(|id| &self.trees[id.0] == tree)
    }

    /// Returns the tree stored under `id`.
    pub fn get(&self, id: TreeId) -> Option<&FieldTypeTree> {
        self.trees.get(id.0)
    }

    /// Number of distinct trees.
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Checks if the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Trees in id order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldTypeTree> {
        self.trees.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::tests::sample_tree;

    #[test]
    fn test_intern_deduplicates_structurally() {
        let mut arena = TreeArena::new();
        let a = arena.intern(sample_tree("GameObject"));
        let b = arena.intern(sample_tree("GameObject"));
        let c = arena.intern(sample_tree("Transform"));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(arena.len(), 2);
        assert_eq!(a.index(), 0);
        assert_eq!(c.index(), 1);
        assert_eq!(arena.get(c), Some(&sample_tree("Transform")));
    }

    #[test]
    fn test_find() {
        let mut arena = TreeArena::new();
        assert!(arena.is_empty());
        let id = arena.intern(sample_tree("GameObject"));
        assert_eq!(arena.find(&sample_tree("GameObject")), Some(id));
        assert_eq!(arena.find(&sample_tree("Camera")), None);
    }
}
