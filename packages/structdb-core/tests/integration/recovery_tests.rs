//! Unreadable databases degrade to an empty store.

use std::fs;

use ntest::timeout;
use tempfile::tempdir;

use structdb_core::persistence::{encode, DatabaseImage};
use structdb_core::{DbConfig, StructDatabase, TypeTreeMap};

use super::helpers::{config_in, embedded, game_object_tree, transform_tree};

fn saved_map() -> TypeTreeMap {
    let mut map = TypeTreeMap::new();
    map.add(1, "5.3.0f1", game_object_tree(4));
    map.add(4, "5.3.0f1", transform_tree());
    map
}

#[timeout(2000)]
#[test]
fn test_version_mismatch_starts_empty() {
    let temp_dir = tempdir().unwrap();
    let config = config_in(temp_dir.path());

    let mut bytes = encode(&saved_map()).unwrap();
    bytes[..4].copy_from_slice(&2i32.to_be_bytes());
    fs::write(&config.db_path, bytes).unwrap();

    let db = StructDatabase::open(&config);
    assert!(db.type_tree_map().is_empty());
    assert_eq!(db.source(), None);
}

#[timeout(2000)]
#[test]
fn test_truncated_file_keeps_no_partial_store() {
    let temp_dir = tempdir().unwrap();
    let config = config_in(temp_dir.path());

    let bytes = encode(&saved_map()).unwrap();
    fs::write(&config.db_path, &bytes[..bytes.len() - 6]).unwrap();

    let db = StructDatabase::open(&config);
    assert!(db.type_tree_map().is_empty());
}

#[timeout(2000)]
#[test]
fn test_dangling_mapping_index_starts_empty() {
    let temp_dir = tempdir().unwrap();
    let config = config_in(temp_dir.path());

    let mut image = DatabaseImage::from_map(&saved_map());
    image.mapping[1].tree_index = 17;
    fs::write(&config.db_path, image.write().unwrap()).unwrap();

    let db = StructDatabase::open(&config);
    assert!(db.type_tree_map().is_empty());
}

#[timeout(2000)]
#[test]
fn test_corrupt_database_is_replaced_on_update() {
    let temp_dir = tempdir().unwrap();
    let config = config_in(temp_dir.path());
    fs::write(&config.db_path, b"garbage").unwrap();

    let mut db = StructDatabase::open(&config);
    assert_eq!(db.learn(&embedded("5.3.0f1", vec![(1, game_object_tree(4))])), 1);
    assert!(db.update());

    let db = StructDatabase::open(&config);
    assert_eq!(db.type_tree_map().len(), 1);
}

#[timeout(2000)]
#[test]
fn test_bundled_fallback_then_user_override() {
    let temp_dir = tempdir().unwrap();
    let bundled = temp_dir.path().join("resources").join("structdb.dat");
    fs::create_dir_all(bundled.parent().unwrap()).unwrap();
    fs::write(&bundled, encode(&saved_map()).unwrap()).unwrap();

    let config = DbConfig {
        fallback_path: Some(bundled.clone()),
        ..config_in(temp_dir.path())
    };

    let mut db = StructDatabase::open(&config);
    assert_eq!(db.source(), Some(bundled.as_path()));
    assert_eq!(db.type_tree_map().len(), 2);

    // Saves always go to the user-level file; the bundled copy stays untouched.
    db.learn(&embedded("5.4.0f1", vec![(1, game_object_tree(4))]));
    assert!(db.update());
    assert_eq!(fs::read(&bundled).unwrap(), encode(&saved_map()).unwrap());

    let db = StructDatabase::open(&config);
    assert_eq!(db.source(), Some(config.db_path.as_path()));
    assert_eq!(db.type_tree_map().len(), 3);
}
