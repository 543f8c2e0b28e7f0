//! Path-restricted index updates.
//!
//! Instead of a whole-tree merge, the index is diffed against the target
//! tree and only the differing paths under the pathspec are rewritten.
//! `HEAD` and working files are never touched.

use rewind_diff::diff_index_to_tree;
use rewind_index::{Index, IndexEntry, Pathspec};
use rewind_store::ObjectStore;
use rewind_types::ObjectId;
use tracing::debug;

use crate::error::ResetResult;

/// Make the entries of `index` under `pathspec` match `tree`.
///
/// Paths the tree lacks are unstaged, or kept as intent-to-add placeholders
/// when `intent_to_add` is set. Returns the rewritten paths in name order.
pub fn reset_paths(
    store: &dyn ObjectStore,
    index: &mut Index,
    tree: &ObjectId,
    pathspec: &Pathspec,
    intent_to_add: bool,
) -> ResetResult<Vec<String>> {
    let diff = diff_index_to_tree(store, tree, index, pathspec)?;

    let mut touched = Vec::with_capacity(diff.len());
    for change in &diff.changes {
        let path = change.path();
        match change.new_entry() {
            Some(entry) => index.add(IndexEntry::from_tree_entry(&entry))?,
            None => {
                index.remove_path(path);
                if intent_to_add {
                    index.add(IndexEntry::intent_to_add(path))?;
                }
            }
        }
        touched.push(path.to_string());
    }

    debug!(
        tree = %tree.short_hex(),
        patterns = pathspec.patterns().len(),
        touched = touched.len(),
        "paths reset from tree"
    );
    Ok(touched)
}

/// Re-stage `paths` as intent-to-add placeholders.
///
/// Used after a whole-tree mixed reset with intent-to-add, for the paths the
/// one-way pass dropped.
pub fn keep_as_intent_to_add(index: &mut Index, paths: &[String]) -> ResetResult<()> {
    for path in paths {
        index.add(IndexEntry::intent_to_add(path.as_str()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewind_index::Stage;
    use rewind_store::{EntryMode, InMemoryObjectStore, TreeBuilder};

    fn oid(s: &str) -> ObjectId {
        ObjectId::from_bytes(s.as_bytes())
    }

    fn tree(store: &dyn ObjectStore, entries: &[(&str, &str)]) -> ObjectId {
        let mut b = TreeBuilder::new();
        for (p, c) in entries {
            b.insert(p, EntryMode::Regular, oid(c)).unwrap();
        }
        b.write(store).unwrap()
    }

    fn index(entries: &[(&str, &str)]) -> Index {
        let mut idx = Index::new();
        for (p, c) in entries {
            idx.add(IndexEntry::new(*p, oid(c), EntryMode::Regular, 0))
                .unwrap();
        }
        idx
    }

    #[test]
    fn only_matched_paths_change() {
        let store = InMemoryObjectStore::new();
        let t = tree(&store, &[("src/a", "1"), ("src/b", "1"), ("top", "1")]);
        let mut idx = index(&[("src/a", "2"), ("src/new", "n"), ("top", "2")]);

        let touched =
            reset_paths(&store, &mut idx, &t, &Pathspec::new(["src"]), false).unwrap();
        assert_eq!(touched, vec!["src/a", "src/b", "src/new"]);
        assert_eq!(idx.get("src/a").unwrap().object_id, oid("1"));
        assert_eq!(idx.get("src/b").unwrap().object_id, oid("1"));
        assert!(idx.get("src/new").is_none());
        assert_eq!(idx.get("top").unwrap().object_id, oid("2"));
    }

    #[test]
    fn intent_to_add_keeps_placeholder() {
        let store = InMemoryObjectStore::new();
        let t = tree(&store, &[("kept", "1")]);
        let mut idx = index(&[("kept", "1"), ("added", "x")]);

        reset_paths(&store, &mut idx, &t, &Pathspec::new(["added"]), true).unwrap();
        let entry = idx.get("added").unwrap();
        assert!(entry.is_intent_to_add());
        assert_eq!(idx.len(), 2);
    }

    #[test]
    fn resolves_conflicted_path_from_tree() {
        let store = InMemoryObjectStore::new();
        let t = tree(&store, &[("c", "base")]);
        let mut idx = Index::new();
        idx.add(IndexEntry::conflict("c", oid("base"), EntryMode::Regular, Stage::Base))
            .unwrap();
        idx.add(IndexEntry::conflict("c", oid("ours"), EntryMode::Regular, Stage::Ours))
            .unwrap();

        reset_paths(&store, &mut idx, &t, &Pathspec::new(["c"]), false).unwrap();
        assert!(!idx.has_unmerged());
        assert_eq!(idx.get("c").unwrap().object_id, oid("base"));
    }

    #[test]
    fn already_matching_is_untouched() {
        let store = InMemoryObjectStore::new();
        let t = tree(&store, &[("a", "1")]);
        let mut idx = index(&[("a", "1")]);
        let before = idx.clone();
        let touched = reset_paths(&store, &mut idx, &t, &Pathspec::new(["a"]), false).unwrap();
        assert!(touched.is_empty());
        assert_eq!(idx, before);
    }
}
