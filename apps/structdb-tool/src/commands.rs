//! Subcommand implementations.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use structdb_core::persistence::{read_map, DatabaseImage, PersistenceManager};
use structdb_core::{
    ClassNameResolver, ClassNameTable, DbConfig, FieldTypeTree, Revision, StructDatabase,
    TypeTreeMap,
};

/// Reads the optional config file and applies `STRUCTDB_*` overrides.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<DbConfig> {
    let mut config = match path {
        Some(path) => DbConfig::from_file(path)?,
        None => DbConfig::default(),
    };
    config.apply_env_overrides()?;
    Ok(config)
}

/// The explicit file, or the database `open` would load.
pub fn database_file(config: &DbConfig, file: Option<PathBuf>) -> PathBuf {
    file.unwrap_or_else(|| {
        PersistenceManager::new(config)
            .locate()
            .unwrap_or_else(|_| config.db_path.clone())
    })
}

fn load(path: &Path) -> anyhow::Result<TypeTreeMap> {
    read_map(path).with_context(|| format!("Failed to load {}", path.display()))
}

pub fn info(out: &mut impl Write, path: &Path) -> anyhow::Result<()> {
    let map = load(path)?;
    let image = DatabaseImage::from_map(&map);
    let size = std::fs::metadata(path)?.len();

    writeln!(out, "File:      {} ({} bytes)", path.display(), size)?;
    writeln!(out, "Entries:   {}", image.mapping.len())?;
    writeln!(out, "Trees:     {}", image.trees.len())?;
    writeln!(out, "Revisions: {}", image.revisions.len())?;
    writeln!(out, "Classes:   {}", map.class_ids().len())?;
    Ok(())
}

/// Entry selection for `dump`.
#[derive(Debug, Default)]
pub struct DumpFilter {
    pub class: Option<i32>,
    pub revision: Option<String>,
}

#[derive(Serialize)]
struct DumpRow<'a> {
    class_id: i32,
    class_name: Option<&'a str>,
    revision: &'a Revision,
    fingerprint: String,
    nodes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    tree: Option<&'a FieldTypeTree>,
}

pub fn dump(
    out: &mut impl Write,
    path: &Path,
    filter: &DumpFilter,
    json: bool,
) -> anyhow::Result<()> {
    let map = load(path)?;
    let names = ClassNameTable::with_common_names();

    let rows: Vec<DumpRow<'_>> = map
        .entries()
        .filter(|(key, _)| filter.class.map_or(true, |c| key.class_id == c))
        .filter(|(key, _)| {
            filter
                .revision
                .as_deref()
                .map_or(true, |r| key.revision.as_str() == r)
        })
        .map(|(key, tree)| DumpRow {
            class_id: key.class_id,
            class_name: names.resolve(key.class_id),
            revision: &key.revision,
            fingerprint: tree.fingerprint().to_string(),
            nodes: tree.node_count(),
            tree: json.then_some(tree),
        })
        .collect();

    if json {
        serde_json::to_writer_pretty(&mut *out, &rows)?;
        writeln!(out)?;
        return Ok(());
    }

    for row in &rows {
        writeln!(
            out,
            "{:>6}  {:<20}  {:<12}  {}  {} nodes",
            row.class_id,
            row.class_name.unwrap_or("?"),
            row.revision,
            row.fingerprint,
            row.nodes
        )?;
    }
    Ok(())
}

pub fn lookup(
    out: &mut impl Write,
    path: &Path,
    class_id: i32,
    revision: &str,
    strict: bool,
) -> anyhow::Result<()> {
    let map = load(path)?;
    let revision = Revision::from(revision);

    let key = if strict {
        map.contains(class_id, &revision)
            .then(|| structdb_core::DatabaseKey::new(class_id, revision.clone()))
    } else {
        map.resolve_key(class_id, &revision).cloned()
    };

    match key.and_then(|key| map.get(key.class_id, &key.revision, true).map(|t| (key, t))) {
        Some((key, tree)) => {
            writeln!(
                out,
                "{} -> {} ({}, {} nodes)",
                structdb_core::DatabaseKey::new(class_id, revision),
                key,
                tree.fingerprint(),
                tree.node_count()
            )?;
        }
        None => writeln!(out, "{}@{}: no entry", class_id, revision)?,
    }
    Ok(())
}

pub fn merge(
    out: &mut impl Write,
    config: &DbConfig,
    target: &Path,
    sources: &[PathBuf],
) -> anyhow::Result<()> {
    // A corrupt target must fail loudly rather than be overwritten.
    let map = if target.exists() {
        load(target)?
    } else {
        TypeTreeMap::new()
    };
    let target_config = DbConfig {
        db_path: target.to_path_buf(),
        fallback_path: None,
        ..config.clone()
    };
    let mut db = StructDatabase::with_map(&target_config, map);

    for source in sources {
        let stats = db.merge_from(&load(source)?);
        tracing::info!(
            "Merged {} into {}: {} added, {} conflicting",
            source.display(),
            target.display(),
            stats.added,
            stats.conflicts
        );
        if stats.conflicts > 0 {
            tracing::warn!(
                "{} entries of {} disagree with {}, kept the existing trees",
                stats.conflicts,
                source.display(),
                target.display()
            );
        }
        writeln!(
            out,
            "{}: {} added, {} conflicting",
            source.display(),
            stats.added,
            stats.conflicts
        )?;
    }

    let learned = db.learned_count();
    if db.try_update()? {
        writeln!(out, "Wrote {} new entries to {}", learned, target.display())?;
    } else {
        writeln!(out, "Nothing new, {} unchanged", target.display())?;
    }
    Ok(())
}
