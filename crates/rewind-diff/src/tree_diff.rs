//! Path-level change sets between two flattened listings.
//!
//! Listings are flattened to full paths first, so a change deep inside a
//! directory is reported at its leaf path.

use std::collections::BTreeMap;

use rewind_index::Pathspec;
use rewind_store::{flatten_tree, EntryMode, ObjectKind, ObjectStore, TreeEntry};
use rewind_types::ObjectId;

use crate::error::{DiffError, DiffResult};

/// The result of comparing two snapshots.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TreeDiff {
    /// Changes in path order.
    pub changes: Vec<TreeChange>,
}

impl TreeDiff {
    /// Returns `true` if there are no changes.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changes.
    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

/// A single change between two snapshots.
#[derive(Clone, Debug, PartialEq)]
pub enum TreeChange {
    /// A new entry was added.
    Added {
        path: String,
        new_id: ObjectId,
        mode: EntryMode,
    },
    /// An existing entry was deleted.
    Deleted {
        path: String,
        old_id: ObjectId,
        mode: EntryMode,
    },
    /// An entry's content changed (same path, different object ID).
    Modified {
        path: String,
        old_id: ObjectId,
        new_id: ObjectId,
        mode: EntryMode,
    },
    /// An entry's mode changed but content is the same.
    ModeChanged {
        path: String,
        id: ObjectId,
        old_mode: EntryMode,
        new_mode: EntryMode,
    },
}

impl TreeChange {
    /// The path this change applies to.
    pub fn path(&self) -> &str {
        match self {
            Self::Added { path, .. }
            | Self::Deleted { path, .. }
            | Self::Modified { path, .. }
            | Self::ModeChanged { path, .. } => path,
        }
    }

    /// The entry on the new side, or `None` for deletions.
    pub fn new_entry(&self) -> Option<TreeEntry> {
        match self {
            Self::Added { path, new_id, mode } | Self::Modified { path, new_id, mode, .. } => {
                Some(TreeEntry::new(*mode, path.clone(), *new_id))
            }
            Self::ModeChanged {
                path, id, new_mode, ..
            } => Some(TreeEntry::new(*new_mode, path.clone(), *id)),
            Self::Deleted { .. } => None,
        }
    }
}

/// Flatten the tree `tree_id`, rejecting ids that are not trees.
pub(crate) fn load_tree_entries(
    store: &dyn ObjectStore,
    tree_id: &ObjectId,
) -> DiffResult<BTreeMap<String, TreeEntry>> {
    match store.kind_of(tree_id)? {
        Some(ObjectKind::Tree) => Ok(flatten_tree(store, tree_id)?),
        Some(actual) => Err(DiffError::NotATree {
            id: *tree_id,
            actual,
        }),
        None => Err(DiffError::ObjectNotFound(*tree_id)),
    }
}

/// Compare two flattened listings. Output is in path order.
pub(crate) fn diff_flat(
    old: &BTreeMap<String, TreeEntry>,
    new: &BTreeMap<String, TreeEntry>,
    pathspec: &Pathspec,
) -> TreeDiff {
    let mut changes: BTreeMap<&str, TreeChange> = BTreeMap::new();

    for (path, old_entry) in old.iter().filter(|(p, _)| pathspec.matches(p)) {
        let change = match new.get(path) {
            Some(new_entry) if old_entry.object_id != new_entry.object_id => {
                TreeChange::Modified {
                    path: path.clone(),
                    old_id: old_entry.object_id,
                    new_id: new_entry.object_id,
                    mode: new_entry.mode,
                }
            }
            Some(new_entry) if old_entry.mode != new_entry.mode => TreeChange::ModeChanged {
                path: path.clone(),
                id: old_entry.object_id,
                old_mode: old_entry.mode,
                new_mode: new_entry.mode,
            },
            Some(_) => continue,
            None => TreeChange::Deleted {
                path: path.clone(),
                old_id: old_entry.object_id,
                mode: old_entry.mode,
            },
        };
        changes.insert(path, change);
    }

    for (path, new_entry) in new.iter().filter(|(p, _)| pathspec.matches(p)) {
        if !old.contains_key(path) {
            changes.insert(
                path,
                TreeChange::Added {
                    path: path.clone(),
                    new_id: new_entry.object_id,
                    mode: new_entry.mode,
                },
            );
        }
    }

    TreeDiff {
        changes: changes.into_values().collect(),
    }
}
