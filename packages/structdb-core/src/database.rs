//! Struct database facade owning the type tree map and its persistence.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::DbConfig;
use crate::container::{ClassNameResolver, ClassNameTable, Container};
use crate::engine::{self, LearnOutcome};
use crate::error::{Result, StructDbError};
use crate::map::{MergeStats, TypeTreeMap};
use crate::persistence::PersistenceManager;

/// Shared handle to a class-name resolver.
pub type SharedResolver = Arc<dyn ClassNameResolver + Send + Sync>;

/// The struct database.
///
/// Created once by the host with [`open`](Self::open) and passed to whatever fills
/// or learns from containers. Learned entries stay in memory until
/// [`update`](Self::update) writes them out in one batch.
pub struct StructDatabase {
    /// In-memory store
    map: TypeTreeMap,
    /// Entries learned since the last successful save
    learned: usize,
    /// File the store was loaded from, if any
    source: Option<PathBuf>,
    persistence: PersistenceManager,
    names: SharedResolver,
}

impl std::fmt::Debug for StructDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructDatabase")
            .field("entries", &self.map.len())
            .field("learned", &self.learned)
            .field("source", &self.source)
            .field("persistence", &self.persistence)
            .finish_non_exhaustive()
    }
}

impl StructDatabase {
    /// Loads the database described by `config`.
    ///
    /// Never fails: a missing, unreadable, malformed or wrong-version file is
    /// logged and the database starts empty.
    pub fn open(config: &DbConfig) -> Self {
        tracing::info!("Loading struct database");

        let persistence = PersistenceManager::new(config);
        let (map, source) = match persistence.load() {
            Ok((map, path)) => {
                tracing::info!(
                    "Loaded {} struct(s) from {}",
                    map.len(),
                    path.display()
                );
                (map, Some(path))
            }
            Err(StructDbError::NotFound { searched }) => {
                tracing::error!("Can't open struct database: not found (searched: {})", searched);
                (TypeTreeMap::new(), None)
            }
            Err(e) => {
                tracing::error!("Can't read struct database: {}", e);
                (TypeTreeMap::new(), None)
            }
        };

        Self::from_parts(map, source, persistence)
    }

    /// Creates a database around an existing map without touching the disk.
    pub fn with_map(config: &DbConfig, map: TypeTreeMap) -> Self {
        Self::from_parts(map, None, PersistenceManager::new(config))
    }

    fn from_parts(map: TypeTreeMap, source: Option<PathBuf>, persistence: PersistenceManager) -> Self {
        Self {
            map,
            learned: 0,
            source,
            persistence,
            names: Arc::new(ClassNameTable::with_common_names()),
        }
    }

    /// Replaces the class-name resolver used for diagnostics.
    pub fn with_class_names(mut self, names: SharedResolver) -> Self {
        self.names = names;
        self
    }

    /// Number of entries learned but not yet saved.
    pub fn learned_count(&self) -> usize {
        self.learned
    }

    /// The in-memory store.
    pub fn type_tree_map(&self) -> &TypeTreeMap {
        &self.map
    }

    /// File the database was loaded from, `None` when it started empty.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// File written by [`update`](Self::update).
    pub fn db_path(&self) -> &Path {
        self.persistence.db_path()
    }

    /// Fills the container's missing type trees from the database.
    /// Returns the number of classes filled.
    pub fn fill<C: Container + ?Sized>(&self, container: &mut C) -> usize {
        engine::fill(&self.map, container)
    }

    /// Learns previously unseen type trees from the container.
    /// Returns the number of new entries.
    pub fn learn<C: Container + ?Sized>(&mut self, container: &C) -> usize {
        self.learn_detailed(container).learned
    }

    /// Like [`learn`](Self::learn), reporting conflicts and skip reasons as well.
    pub fn learn_detailed<C: Container + ?Sized>(&mut self, container: &C) -> LearnOutcome {
        let outcome = engine::learn(&mut self.map, container, self.names.as_ref());
        self.learned += outcome.learned;
        outcome
    }

    /// Imports entries from another map that are missing here.
    /// Imported entries count as learned.
    pub fn merge_from(&mut self, other: &TypeTreeMap) -> MergeStats {
        let stats = self.map.merge_missing(other);
        self.learned += stats.added;
        stats
    }

    /// Saves the database if anything was learned since the last save.
    ///
    /// Returns whether a save happened. On failure the learned counter is kept so a
    /// later call retries.
    pub fn try_update(&mut self) -> Result<bool> {
        if self.learned == 0 {
            return Ok(false);
        }
        tracing::info!("Adding {} new struct(s) to database", self.learned);
        self.persistence.save(&self.map)?;
        self.learned = 0;
        Ok(true)
    }

    /// [`try_update`](Self::try_update), logging instead of returning the error.
    pub fn update(&mut self) -> bool {
        match self.try_update() {
            Ok(saved) => saved,
            Err(e) => {
                tracing::error!("Can't write struct database: {}", e);
                false
            }
        }
    }

    /// Flushes pending entries and drops the database.
    pub fn close(mut self) -> Result<bool> {
        self.try_update()
    }
}

/// [`StructDatabase`] behind a single mutex, for hosts that process containers
/// on several threads.
#[derive(Debug, Clone)]
pub struct SharedStructDatabase {
    inner: Arc<Mutex<StructDatabase>>,
}

impl SharedStructDatabase {
    pub fn new(db: StructDatabase) -> Self {
        Self {
            inner: Arc::new(Mutex::new(db)),
        }
    }

    /// Runs `f` with exclusive access to the database.
    pub fn with<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut StructDatabase) -> R,
    {
        let mut db = self.inner.lock().map_err(|_| StructDbError::LockPoisoned)?;
        Ok(f(&mut db))
    }

    pub fn learned_count(&self) -> Result<usize> {
        self.with(|db| db.learned_count())
    }

    pub fn fill<C: Container + ?Sized>(&self, container: &mut C) -> Result<usize> {
        self.with(|db| db.fill(container))
    }

    pub fn learn<C: Container + ?Sized>(&self, container: &C) -> Result<usize> {
        self.with(|db| db.learn(container))
    }

    pub fn update(&self) -> Result<bool> {
        self.with(|db| db.try_update())?
    }

    /// Learns from the container and saves, under one lock acquisition.
    pub fn learn_and_update<C: Container + ?Sized>(&self, container: &C) -> Result<usize> {
        self.with(|db| {
            let learned = db.learn(container);
            db.try_update().map(|_| learned)
        })?
    }

    /// Takes the database back out if this is the last handle.
    pub fn into_inner(self) -> std::result::Result<StructDatabase, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => mutex
                .into_inner()
                .map_err(|poisoned| Self::new(poisoned.into_inner())),
            Err(inner) => Err(Self { inner }),
        }
    }
}
