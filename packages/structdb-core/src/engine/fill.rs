//! Filling database type trees into containers written without them.

use crate::container::Container;
use crate::map::TypeTreeMap;

/// Injects known type trees into `container`.
///
/// Without a revision nothing is touched, not even the externally-sourced flag.
/// Otherwise every class with a (non-strict) database match gets that tree, and the
/// container is marked externally sourced whether or not anything matched.
///
/// Returns the number of classes filled.
pub fn fill<C: Container + ?Sized>(map: &TypeTreeMap, container: &mut C) -> usize {
    let revision = match container.revision() {
        Some(revision) => revision.clone(),
        None => {
            tracing::warn!("Container has no revision, skipping fill");
            return 0;
        }
    };

    let mut filled = 0;
    for class_id in container.class_ids() {
        if let Some(tree) = map.get(class_id, &revision, false) {
            container.put_metadata(class_id, tree.clone());
            filled += 1;
        }
    }

    tracing::debug!("Filled {} type tree(s) for revision {}", filled, revision);

    // don't write the trees back into the container
    container.set_externally_sourced(true);
    filled
}
