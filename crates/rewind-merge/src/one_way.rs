//! One-way replace.

use rewind_index::{Index, IndexEntry};
use rewind_store::{flatten_tree, ObjectStore};
use rewind_types::ObjectId;
use tracing::debug;

use crate::error::MergeResult;

/// Make `index` stage every entry of `target` at stage 0.
///
/// Any prior content at a target path, including unresolved conflict stages,
/// is discarded. With `reset`, paths the target lacks are removed from the
/// index (all stages); otherwise they are left alone.
///
/// Returns the removed paths in name order.
pub fn one_way(
    store: &dyn ObjectStore,
    index: &mut Index,
    target: &ObjectId,
    reset: bool,
) -> MergeResult<Vec<String>> {
    let tree = flatten_tree(store, target)?;

    let mut replaced = 0usize;
    for (path, entry) in &tree {
        let current = index.stages_of(path);
        let unchanged = matches!(current.as_slice(), [only] if only.matches_tree_entry(entry));
        if !unchanged {
            index.add(IndexEntry::from_tree_entry(entry))?;
            replaced += 1;
        }
    }

    let mut removed = Vec::new();
    if reset {
        for path in index.paths() {
            if !tree.contains_key(&path) {
                index.remove_path(&path);
                removed.push(path);
            }
        }
    }

    debug!(
        target = %target.short_hex(),
        replaced,
        removed = removed.len(),
        reset,
        "one-way merge applied"
    );
    Ok(removed)
}
