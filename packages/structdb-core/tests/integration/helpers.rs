//! Shared fixtures for integration tests.

use std::path::Path;

use structdb_core::{DbConfig, FieldTypeTree, MemoryContainer, Revision};

/// Config reading and writing only `structdb.dat` inside `dir`.
pub fn config_in(dir: &Path) -> DbConfig {
    DbConfig {
        persistence_retry_delay_ms: 0,
        ..DbConfig::with_db_path(dir.join("structdb.dat"))
    }
}

/// `GameObject`-shaped tree; `layer_size` varies the layout.
pub fn game_object_tree(layer_size: i32) -> FieldTypeTree {
    FieldTypeTree::new("GameObject", "Base", -1)
        .with_child(FieldTypeTree::new("vector", "m_Component", -1))
        .with_child(FieldTypeTree::new("unsigned int", "m_Layer", layer_size))
        .with_child(FieldTypeTree::new("string", "m_Name", -1))
}

pub fn transform_tree() -> FieldTypeTree {
    FieldTypeTree::new("Transform", "Base", -1)
        .with_child(FieldTypeTree::new("Quaternionf", "m_LocalRotation", 16))
        .with_child(FieldTypeTree::new("Vector3f", "m_LocalPosition", 12))
        .with_child(FieldTypeTree::new("Vector3f", "m_LocalScale", 12))
}

/// Container for `revision` with embedded trees.
pub fn embedded(revision: &str, trees: Vec<(i32, FieldTypeTree)>) -> MemoryContainer {
    trees
        .into_iter()
        .fold(MemoryContainer::new(Some(Revision::from(revision))), |c, (id, tree)| {
            c.with_tree(id, tree)
        })
}

/// Container for `revision` whose classes carry no trees, as written by a
/// stripped build.
pub fn stripped(revision: &str, class_ids: &[i32]) -> MemoryContainer {
    class_ids
        .iter()
        .fold(MemoryContainer::new(Some(Revision::from(revision))), |c, &id| {
            c.with_class(id)
        })
        .externally_sourced(true)
}
