//! Learning type trees from containers that embed them.

use crate::container::{ClassNameResolver, Container};
use crate::map::{ClassId, DatabaseKey, TypeTreeMap};

/// Why a container contributed nothing to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnSkip {
    /// The container's trees were themselves filled from the database
    ExternallySourced,
    /// No revision to key the entries on; they are dropped
    MissingRevision,
    /// The revision contains a NUL byte and could not be saved
    UnencodableRevision,
}

/// Detailed result of learning from one container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LearnOutcome {
    /// Entries added to the database
    pub learned: usize,
    /// Keys whose observed tree differs from the stored one (stored entry kept)
    pub conflicts: Vec<DatabaseKey>,
    /// Class ids the name resolver could not name
    pub unknown_classes: Vec<ClassId>,
    /// Class ids whose tree has a NUL byte in a type or field name (not stored)
    pub rejected: Vec<ClassId>,
    /// Set when the container was skipped as a whole
    pub skipped: Option<LearnSkip>,
}

impl LearnOutcome {
    fn skipped(reason: LearnSkip) -> Self {
        Self {
            skipped: Some(reason),
            ..Default::default()
        }
    }
}

/// Adds the container's previously unseen type trees to `map`.
///
/// Existing entries always win: a differing tree for a known key is reported as a
/// conflict and never replaces the stored one.
pub fn learn<C, R>(map: &mut TypeTreeMap, container: &C, names: &R) -> LearnOutcome
where
    C: Container + ?Sized,
    R: ClassNameResolver + ?Sized,
{
    if container.is_externally_sourced() {
        tracing::info!("No structure data available");
        return LearnOutcome::skipped(LearnSkip::ExternallySourced);
    }

    // older formats don't store the revision in the header
    let Some(revision) = container.revision() else {
        tracing::warn!("Container has no revision, its type trees cannot be learned");
        return LearnOutcome::skipped(LearnSkip::MissingRevision);
    };
    if revision.as_str().contains('\0') {
        tracing::warn!("Container revision {:?} contains a NUL byte, skipping", revision.as_str());
        return LearnOutcome::skipped(LearnSkip::UnencodableRevision);
    }

    let mut outcome = LearnOutcome::default();

    for class_id in container.class_ids() {
        let Some(tree) = container.metadata(class_id) else {
            continue;
        };
        if tree.has_nul_name() {
            tracing::warn!("Type tree of ClassID {} has a NUL byte in a name, skipping", class_id);
            outcome.rejected.push(class_id);
            continue;
        }
        let class_name = names.resolve(class_id);

        match map.get(class_id, revision, true) {
            None => {
                tracing::info!(
                    "New: {} ({})",
                    class_id,
                    class_name.unwrap_or(&tree.type_name)
                );
                map.add(class_id, revision.clone(), tree.clone());
                outcome.learned += 1;
            }
            Some(stored) => {
                let observed_hash = tree.fingerprint();
                let stored_hash = stored.fingerprint();
                if observed_hash != stored_hash || tree != stored {
                    tracing::warn!(
                        "Database hash mismatch for {}: {} != {}",
                        stored.type_name,
                        observed_hash,
                        stored_hash
                    );
                    outcome
                        .conflicts
                        .push(DatabaseKey::new(class_id, revision.clone()));
                }
            }
        }

        if class_name.is_none() {
            tracing::warn!(
                "Unknown ClassID {}, suggested name: {}",
                class_id,
                tree.type_name
            );
            outcome.unknown_classes.push(class_id);
        }
    }

    outcome
}
