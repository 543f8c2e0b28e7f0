//! Memoized per-directory tree ids.
//!
//! A [`CacheTree`] records, for some directories of the index, the id of the
//! tree that the directory's merged entries would produce. An entry is only
//! present while it is exact; any change below a directory removes the
//! cached id of that directory and of all its ancestors.

use std::collections::BTreeMap;

use rewind_store::{ObjectStore, StoreResult};
use rewind_types::ObjectId;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Directory path (`""` for the root) to cached tree id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheTree {
    dirs: BTreeMap<String, ObjectId>,
}

/// Every ancestor directory of `path`, root first, excluding `path` itself.
pub(crate) fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    std::iter::once("").chain(
        path.match_indices('/')
            .map(move |(i, _)| &path[..i]),
    )
}

impl CacheTree {
    /// Create an empty (fully invalid) cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached id of the root tree, if valid.
    pub fn root(&self) -> Option<ObjectId> {
        self.get("")
    }

    /// Cached id of directory `dir`, if valid.
    pub fn get(&self, dir: &str) -> Option<ObjectId> {
        self.dirs.get(dir).copied()
    }

    /// Number of valid directories.
    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Record `id` as the tree of `dir`.
    pub fn insert(&mut self, dir: impl Into<String>, id: ObjectId) {
        self.dirs.insert(dir.into(), id);
    }

    /// Drop the cached id of every directory containing `path`.
    pub fn invalidate_path(&mut self, path: &str) {
        for dir in ancestors(path) {
            self.dirs.remove(dir);
        }
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.dirs.clear();
    }

    /// Replace the cache with the ids of `tree_id` and all of its subtrees.
    ///
    /// Used right after the index was rewritten to match `tree_id` exactly,
    /// so the ids are copied rather than recomputed.
    pub fn prime(&mut self, store: &dyn ObjectStore, tree_id: &ObjectId) -> StoreResult<()> {
        self.dirs.clear();
        self.prime_dir(store, "", tree_id)?;
        debug!(root = %tree_id.short_hex(), dirs = self.dirs.len(), "cache tree primed");
        Ok(())
    }

    fn prime_dir(&mut self, store: &dyn ObjectStore, dir: &str, id: &ObjectId) -> StoreResult<()> {
        self.dirs.insert(dir.to_string(), *id);
        let tree = store.read_tree(id)?;
        for entry in tree.entries.iter().filter(|e| e.mode.is_tree()) {
            let sub = if dir.is_empty() {
                entry.name.clone()
            } else {
                format!("{dir}/{}", entry.name)
            };
            self.prime_dir(store, &sub, &entry.object_id)?;
        }
        Ok(())
    }
}
