//! The core Index structure managing staged entries in memory.
//!
//! The [`Index`] keeps a `BTreeMap<(path, stage), IndexEntry>`, so iteration
//! is in path order with the stages of one path adjacent. Every mutation
//! invalidates the cache-tree ids of the directories containing the path.

use std::collections::{BTreeMap, BTreeSet};

use rewind_store::{EntryMode, ObjectStore, Tree, TreeEntry};
use rewind_types::ObjectId;
use serde::{Deserialize, Serialize};

use crate::cache_tree::CacheTree;
use crate::entry::{IndexEntry, Stage};
use crate::error::{IndexError, IndexResult};

/// The staging index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// The index format version.
    pub version: u32,
    entries: BTreeMap<(String, Stage), IndexEntry>,
    cache_tree: CacheTree,
}

impl Index {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self {
            version: 1,
            ..Self::default()
        }
    }

    /// Number of entries (all stages).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The merged (stage 0) entry at `path`.
    pub fn get(&self, path: &str) -> Option<&IndexEntry> {
        self.get_stage(path, Stage::Merged)
    }

    /// The entry at `path` and `stage`.
    pub fn get_stage(&self, path: &str, stage: Stage) -> Option<&IndexEntry> {
        self.entries.get(&(path.to_string(), stage))
    }

    /// All entries at `path`, lowest stage first.
    pub fn stages_of(&self, path: &str) -> Vec<&IndexEntry> {
        self.entries
            .range((path.to_string(), Stage::Merged)..=(path.to_string(), Stage::Theirs))
            .map(|(_, e)| e)
            .collect()
    }

    /// Returns `true` if any stage exists at `path`.
    pub fn contains_path(&self, path: &str) -> bool {
        !self.stages_of(path).is_empty()
    }

    /// Iterate over every entry in `(path, stage)` order.
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    /// Distinct paths, sorted.
    pub fn paths(&self) -> BTreeSet<String> {
        self.entries.keys().map(|(p, _)| p.clone()).collect()
    }

    /// The cache tree.
    pub fn cache_tree(&self) -> &CacheTree {
        &self.cache_tree
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Insert or replace an entry.
    ///
    /// Adding a merged entry resolves the path: any conflict stages at the
    /// same path are dropped. Adding a conflict stage drops the merged entry.
    pub fn add(&mut self, entry: IndexEntry) -> IndexResult<()> {
        if entry.path.is_empty() || entry.path.starts_with('/') || entry.path.ends_with('/') {
            return Err(IndexError::InvalidPath(entry.path));
        }
        if entry.mode == EntryMode::Directory {
            return Err(IndexError::InvalidPath(format!("{} (directory)", entry.path)));
        }
        if entry.is_merged() {
            self.drop_stages(&entry.path);
        } else {
            self.entries.remove(&(entry.path.clone(), Stage::Merged));
        }
        self.cache_tree.invalidate_path(&entry.path);
        self.entries
            .insert((entry.path.clone(), entry.stage), entry);
        Ok(())
    }

    /// Remove every stage at `path`, returning what was removed.
    pub fn remove_path(&mut self, path: &str) -> Vec<IndexEntry> {
        let removed = self.drop_stages(path);
        if !removed.is_empty() {
            self.cache_tree.invalidate_path(path);
        }
        removed
    }

    fn drop_stages(&mut self, path: &str) -> Vec<IndexEntry> {
        let keys: Vec<(String, Stage)> = self
            .entries
            .range((path.to_string(), Stage::Merged)..=(path.to_string(), Stage::Theirs))
            .map(|(k, _)| k.clone())
            .collect();
        keys.into_iter()
            .filter_map(|k| self.entries.remove(&k))
            .collect()
    }

    /// Remove all entries and the cache tree.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cache_tree.clear();
    }

    /// Seed the cache tree from `tree_id`, which the merged entries must
    /// match exactly.
    pub fn prime_cache_tree(&mut self, store: &dyn ObjectStore, tree_id: &ObjectId) -> IndexResult<()> {
        self.cache_tree.prime(store, tree_id)?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Conflict inspection
    // ---------------------------------------------------------------

    /// Returns `true` if any entry is at a non-zero stage.
    pub fn has_unmerged(&self) -> bool {
        self.entries.values().any(|e| !e.is_merged())
    }

    /// Distinct paths with conflict stages, sorted.
    pub fn unmerged_paths(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .entries
            .values()
            .filter(|e| !e.is_merged())
            .map(|e| e.path.as_str())
            .collect();
        set.into_iter().map(String::from).collect()
    }

    // ---------------------------------------------------------------
    // Tree building
    // ---------------------------------------------------------------

    /// Write the merged entries as nested trees and return the root id.
    ///
    /// Intent-to-add entries are left out. Directories with a valid
    /// cache-tree id are reused as-is; every directory written refreshes its
    /// cache entry.
    pub fn write_tree(&mut self, store: &dyn ObjectStore) -> IndexResult<ObjectId> {
        if let Some(path) = self.unmerged_paths().into_iter().next() {
            return Err(IndexError::UnresolvedConflict(path));
        }
        let leaves: Vec<(String, EntryMode, ObjectId)> = self
            .entries
            .values()
            .filter(|e| !e.is_intent_to_add())
            .map(|e| (e.path.clone(), e.mode, e.object_id))
            .collect();
        let refs: Vec<(&str, EntryMode, ObjectId)> = leaves
            .iter()
            .map(|(p, m, id)| (p.as_str(), *m, *id))
            .collect();
        write_dir(store, &mut self.cache_tree, "", &refs)
    }
}

/// `entries` holds paths relative to `dir`, in sorted order.
fn write_dir(
    store: &dyn ObjectStore,
    cache: &mut CacheTree,
    dir: &str,
    entries: &[(&str, EntryMode, ObjectId)],
) -> IndexResult<ObjectId> {
    if let Some(id) = cache.get(dir) {
        return Ok(id);
    }

    let mut tree_entries = Vec::new();
    let mut i = 0;
    while i < entries.len() {
        let (rel, mode, id) = entries[i];
        match rel.split_once('/') {
            None => {
                tree_entries.push(TreeEntry::new(mode, rel, id));
                i += 1;
            }
            Some((head, _)) => {
                let mut children = Vec::new();
                while i < entries.len() {
                    let (rel, mode, id) = entries[i];
                    match rel.split_once('/') {
                        Some((h, rest)) if h == head => children.push((rest, mode, id)),
                        _ => break,
                    }
                    i += 1;
                }
                let sub = if dir.is_empty() {
                    head.to_string()
                } else {
                    format!("{dir}/{head}")
                };
                let sub_id = write_dir(store, cache, &sub, &children)?;
                tree_entries.push(TreeEntry::new(EntryMode::Directory, head, sub_id));
            }
        }
    }

    let id = store.write_tree(&Tree::new(tree_entries))?;
    cache.insert(dir, id);
    Ok(id)
}
