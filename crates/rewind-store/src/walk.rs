//! Conversion between nested trees and flat path listings.
//!
//! Stored trees are hierarchical (one component per entry name, subtrees for
//! directories). The index and the diff engine work on flat, slash-separated
//! paths; [`flatten_tree`] and [`TreeBuilder`] translate between the two.

use std::collections::BTreeMap;

use rewind_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{EntryMode, Tree, TreeEntry};
use crate::traits::ObjectStore;

/// Split a slash-separated relative path into its components.
///
/// Rejects empty paths, absolute paths, trailing slashes, empty components
/// and `.`/`..` components.
pub fn split_path(path: &str) -> StoreResult<Vec<&str>> {
    if path.is_empty() || path.starts_with('/') || path.ends_with('/') {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    let parts: Vec<&str> = path.split('/').collect();
    if parts.iter().any(|p| p.is_empty() || *p == "." || *p == "..") {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(parts)
}

/// Flatten a tree into a map of full path to leaf entry.
///
/// Subtrees are descended into; blobs and gitlinks become leaves whose
/// `name` is the full slash-separated path. Iteration order of the returned
/// map is the name-sorted traversal order.
pub fn flatten_tree(
    store: &dyn ObjectStore,
    tree_id: &ObjectId,
) -> StoreResult<BTreeMap<String, TreeEntry>> {
    let mut out = BTreeMap::new();
    flatten_into(store, tree_id, "", &mut out)?;
    Ok(out)
}

fn flatten_into(
    store: &dyn ObjectStore,
    tree_id: &ObjectId,
    prefix: &str,
    out: &mut BTreeMap<String, TreeEntry>,
) -> StoreResult<()> {
    let tree = store.read_tree(tree_id)?;
    for entry in &tree.entries {
        let path = if prefix.is_empty() {
            entry.name.clone()
        } else {
            format!("{prefix}/{}", entry.name)
        };
        if entry.mode.is_tree() {
            flatten_into(store, &entry.object_id, &path, out)?;
        } else {
            out.insert(path.clone(), TreeEntry::new(entry.mode, path, entry.object_id));
        }
    }
    Ok(())
}

/// Builds nested tree objects from flat `(path, mode, id)` triples.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    root: Node,
}

#[derive(Debug, Default)]
struct Node {
    leaves: BTreeMap<String, (EntryMode, ObjectId)>,
    dirs: BTreeMap<String, Node>,
}

impl TreeBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a leaf entry at `path`, replacing any leaf already there.
    ///
    /// Fails if the path is malformed or collides with a directory (or a
    /// parent component collides with a file).
    pub fn insert(&mut self, path: &str, mode: EntryMode, id: ObjectId) -> StoreResult<()> {
        if mode.is_tree() {
            return Err(StoreError::InvalidPath(format!("{path} (directory leaf)")));
        }
        let parts = split_path(path)?;
        let (last, dirs) = parts
            .split_last()
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;

        let mut node = &mut self.root;
        for dir in dirs {
            if node.leaves.contains_key(*dir) {
                return Err(StoreError::InvalidPath(path.to_string()));
            }
            node = node.dirs.entry((*dir).to_string()).or_default();
        }
        if node.dirs.contains_key(*last) {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        node.leaves.insert((*last).to_string(), (mode, id));
        Ok(())
    }

    /// Write every tree bottom-up and return the root tree id.
    pub fn write(&self, store: &dyn ObjectStore) -> StoreResult<ObjectId> {
        write_node(store, &self.root)
    }
}

fn write_node(store: &dyn ObjectStore, node: &Node) -> StoreResult<ObjectId> {
    let mut entries = Vec::with_capacity(node.leaves.len() + node.dirs.len());
    for (name, (mode, id)) in &node.leaves {
        entries.push(TreeEntry::new(*mode, name.clone(), *id));
    }
    for (name, child) in &node.dirs {
        let id = write_node(store, child)?;
        entries.push(TreeEntry::new(EntryMode::Directory, name.clone(), id));
    }
    store.write_tree(&Tree::new(entries))
}
