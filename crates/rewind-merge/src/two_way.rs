//! Two-way structural merge.
//!
//! Moves the index from a base tree `H` to a target tree `T` while keeping
//! local index changes. For each path, with `I` the staged entry:
//!
//! | condition            | result                  |
//! |----------------------|-------------------------|
//! | `I == H`             | take `T` (drop if none) |
//! | `I != H`, `T == H`   | keep `I`                |
//! | `I != H`, `T != H`   | conflict                |
//!
//! Entries compare by `(mode, id)`; absence is a value. An intent-to-add or
//! unmerged path never equals a tree entry.

use std::collections::{BTreeMap, BTreeSet};

use rewind_index::{Index, IndexEntry};
use rewind_store::{flatten_tree, EntryMode, ObjectStore, TreeEntry};
use rewind_types::ObjectId;
use tracing::debug;

use crate::error::{MergeError, MergeResult};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Absent,
    Entry(EntryMode, ObjectId),
    /// Staged state no tree can hold (placeholder or conflict stages).
    Unrepresentable,
}

fn tree_side(tree: &BTreeMap<String, TreeEntry>, path: &str) -> Side {
    tree.get(path)
        .map_or(Side::Absent, |e| Side::Entry(e.mode, e.object_id))
}

fn index_side(index: &Index, path: &str) -> Side {
    match index.stages_of(path).as_slice() {
        [] => Side::Absent,
        [only] if only.is_merged() && !only.is_intent_to_add() => {
            Side::Entry(only.mode, only.object_id)
        }
        _ => Side::Unrepresentable,
    }
}

/// Merge `base -> target` into a copy of `index`.
///
/// On success the merged index is returned and `index` itself is untouched.
/// If any path conflicts, nothing is applied and [`MergeError::Conflict`]
/// lists every conflicting path in name order.
pub fn two_way(
    store: &dyn ObjectStore,
    index: &Index,
    base: &ObjectId,
    target: &ObjectId,
) -> MergeResult<Index> {
    let head = flatten_tree(store, base)?;
    let new = flatten_tree(store, target)?;

    let paths: BTreeSet<String> = index
        .paths()
        .into_iter()
        .chain(head.keys().cloned())
        .chain(new.keys().cloned())
        .collect();

    let mut merged = index.clone();
    let mut conflicts = Vec::new();
    let mut taken = 0usize;

    for path in &paths {
        let i = index_side(index, path);
        let h = tree_side(&head, path);
        let t = tree_side(&new, path);

        if i == h {
            if t == h {
                continue;
            }
            match new.get(path) {
                Some(entry) => merged.add(IndexEntry::from_tree_entry(entry))?,
                None => {
                    merged.remove_path(path);
                }
            }
            taken += 1;
        } else if t != h {
            conflicts.push(path.clone());
        }
    }

    if !conflicts.is_empty() {
        debug!(conflicts = conflicts.len(), first = %conflicts[0], "two-way merge conflicted");
        return Err(MergeError::Conflict { paths: conflicts });
    }

    debug!(
        base = %base.short_hex(),
        target = %target.short_hex(),
        taken,
        "two-way merge applied"
    );
    Ok(merged)
}
