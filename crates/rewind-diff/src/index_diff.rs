//! Index-to-tree diff.
//!
//! The index is the old side and the target tree the new side, so applying
//! each change's [`TreeChange::new_entry`] to the index makes it match the
//! tree at that path.

use std::collections::BTreeMap;

use rewind_index::{Index, Pathspec};
use rewind_store::{ObjectStore, TreeEntry};
use rewind_types::ObjectId;
use tracing::debug;

use crate::error::DiffResult;
use crate::tree_diff::{diff_flat, load_tree_entries, TreeChange, TreeDiff};

/// Compare the staged `index` against `tree_id`, restricted to `pathspec`.
///
/// Merged entries differ from the tree when their mode or id differ. A path
/// that is unmerged in the index, or staged only as an intent-to-add
/// placeholder, always differs from a tree that has it, and shows up as
/// deleted when the tree lacks it.
pub fn diff_index_to_tree(
    store: &dyn ObjectStore,
    tree_id: &ObjectId,
    index: &Index,
    pathspec: &Pathspec,
) -> DiffResult<TreeDiff> {
    let tree = load_tree_entries(store, tree_id)?;

    let mut staged: BTreeMap<String, TreeEntry> = BTreeMap::new();
    let mut forced: Vec<String> = Vec::new();
    for path in index.paths().into_iter().filter(|p| pathspec.matches(p)) {
        let stages = index.stages_of(&path);
        let clean = match stages.as_slice() {
            [only] => only.is_merged() && !only.is_intent_to_add(),
            _ => false,
        };
        if let Some(first) = stages.first() {
            staged.insert(path.clone(), first.to_tree_entry());
        }
        if !clean {
            forced.push(path);
        }
    }

    let mut diff = diff_flat(&staged, &tree, pathspec);

    // Unmerged or placeholder paths whose first stage happens to equal the
    // tree entry still need rewriting.
    for path in forced {
        if diff.changes.iter().any(|c| c.path() == path) {
            continue;
        }
        if let (Some(old), Some(new)) = (staged.get(&path), tree.get(&path)) {
            diff.changes.push(TreeChange::Modified {
                path: path.clone(),
                old_id: old.object_id,
                new_id: new.object_id,
                mode: new.mode,
            });
        }
    }
    diff.changes.sort_by(|a, b| a.path().cmp(b.path()));

    debug!(tree = %tree_id.short_hex(), changes = diff.len(), "index diffed against tree");
    Ok(diff)
}
