//! Learn → update → reload → fill workflows.

use ntest::timeout;
use tempfile::tempdir;

use structdb_core::container::Container;
use structdb_core::{DatabaseKey, LearnSkip, MemoryContainer, Revision, StructDatabase};

use super::helpers::{config_in, embedded, game_object_tree, stripped, transform_tree};

#[timeout(2000)]
#[test]
fn test_learn_save_reload_fill() {
    let temp_dir = tempdir().unwrap();
    let config = config_in(temp_dir.path());

    let mut db = StructDatabase::open(&config);
    let a = embedded("5.3.0", vec![(1, game_object_tree(4))]);
    assert!(!a.is_externally_sourced());
    assert_eq!(db.learn(&a), 1);
    assert_eq!(db.learned_count(), 1);
    assert!(db.update());

    let db = StructDatabase::open(&config);
    assert_eq!(db.source(), Some(config.db_path.as_path()));
    assert_eq!(db.learned_count(), 0);

    let mut b = stripped("5.3.0", &[1]);
    assert_eq!(db.fill(&mut b), 1);
    assert_eq!(b.metadata(1), Some(&game_object_tree(4)));
    assert!(b.is_externally_sourced());
}

#[timeout(2000)]
#[test]
fn test_conflict_is_reported_not_applied() {
    let temp_dir = tempdir().unwrap();
    let mut db = StructDatabase::open(&config_in(temp_dir.path()));

    assert_eq!(db.learn(&embedded("5.3.0", vec![(1, game_object_tree(4))])), 1);

    let c = embedded("5.3.0", vec![(1, game_object_tree(8))]);
    let outcome = db.learn_detailed(&c);
    assert_eq!(outcome.learned, 0);
    assert_eq!(outcome.conflicts, vec![DatabaseKey::new(1, "5.3.0")]);
    assert_eq!(
        db.type_tree_map().get(1, &Revision::from("5.3.0"), true),
        Some(&game_object_tree(4))
    );
    assert_eq!(db.learned_count(), 1);
}

#[timeout(2000)]
#[test]
fn test_learn_twice_learns_nothing_new() {
    let temp_dir = tempdir().unwrap();
    let mut db = StructDatabase::open(&config_in(temp_dir.path()));
    let container = embedded(
        "5.3.0f1",
        vec![(1, game_object_tree(4)), (4, transform_tree())],
    );

    assert_eq!(db.learn(&container), 2);
    assert_eq!(db.learn(&container), 0);
    assert_eq!(db.learned_count(), 2);
}

#[timeout(2000)]
#[test]
fn test_batched_persistence_across_containers() {
    let temp_dir = tempdir().unwrap();
    let config = config_in(temp_dir.path());
    let mut db = StructDatabase::open(&config);

    let revisions = ["4.7.2f1", "5.3.0f1", "5.6.0f3"];
    for revision in revisions {
        db.learn(&embedded(
            revision,
            vec![(1, game_object_tree(4)), (4, transform_tree())],
        ));
    }
    assert_eq!(db.learned_count(), 6);
    assert!(!config.db_path.exists());

    assert!(db.update());
    let written = std::fs::metadata(&config.db_path).unwrap().modified().unwrap();
    assert!(!db.update());
    assert_eq!(
        std::fs::metadata(&config.db_path).unwrap().modified().unwrap(),
        written
    );

    let reloaded = StructDatabase::open(&config);
    assert_eq!(reloaded.type_tree_map().len(), 6);
    // Two distinct layouts shared by six keys.
    assert_eq!(reloaded.type_tree_map().values().len(), 2);
}

#[timeout(2000)]
#[test]
fn test_missing_revision_is_distinguishable() {
    let temp_dir = tempdir().unwrap();
    let mut db = StructDatabase::open(&config_in(temp_dir.path()));

    let legacy = MemoryContainer::new(None).with_tree(1, game_object_tree(4));
    assert_eq!(db.learn(&legacy), 0);
    assert_eq!(
        db.learn_detailed(&legacy).skipped,
        Some(LearnSkip::MissingRevision)
    );
    assert!(db.type_tree_map().is_empty());

    let mut legacy_stripped = MemoryContainer::new(None).with_class(1);
    assert_eq!(db.fill(&mut legacy_stripped), 0);
    assert!(!legacy_stripped.is_externally_sourced());
}

#[timeout(2000)]
#[test]
fn test_filled_container_is_not_relearned() {
    let temp_dir = tempdir().unwrap();
    let mut db = StructDatabase::open(&config_in(temp_dir.path()));
    db.learn(&embedded("5.3.0f1", vec![(1, game_object_tree(4))]));

    let mut filled = MemoryContainer::new(Some(Revision::from("5.4.0f1"))).with_class(1);
    assert_eq!(db.fill(&mut filled), 1);
    assert_eq!(db.learn(&filled), 0);
    assert_eq!(
        db.learn_detailed(&filled).skipped,
        Some(LearnSkip::ExternallySourced)
    );
    assert_eq!(db.type_tree_map().len(), 1);
}
