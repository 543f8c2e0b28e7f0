//! Index entry types.

use rewind_store::{Blob, EntryMode, TreeEntry};
use rewind_types::ObjectId;
use serde::{Deserialize, Serialize};

/// Merge stage of an index entry.
///
/// `Merged` entries are the normal case. The other three only exist while a
/// conflict is unresolved and hold the common ancestor, our side and their
/// side respectively.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    Merged = 0,
    Base = 1,
    Ours = 2,
    Theirs = 3,
}

impl Stage {
    /// Numeric stage (0-3).
    pub fn number(self) -> u8 {
        self as u8
    }
}

/// Status flags for an index entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFlags {
    /// Placeholder recording that the path will be added later. The entry
    /// points at the empty blob and is left out of written trees.
    pub intent_to_add: bool,
}

/// An entry in the staging index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Slash-separated path relative to the worktree root.
    pub path: String,
    /// Content-addressed ID of the blob (or submodule commit).
    pub object_id: ObjectId,
    /// File mode.
    pub mode: EntryMode,
    /// Merge stage.
    pub stage: Stage,
    /// Content size in bytes, `0` when unknown.
    pub size: u64,
    /// Status flags.
    pub flags: IndexFlags,
}

impl IndexEntry {
    /// Create a merged (stage 0) entry.
    pub fn new(path: impl Into<String>, object_id: ObjectId, mode: EntryMode, size: u64) -> Self {
        Self {
            path: path.into(),
            object_id,
            mode,
            stage: Stage::Merged,
            size,
            flags: IndexFlags::default(),
        }
    }

    /// Create a merged entry from a flattened tree entry (whose `name` is the
    /// full path).
    pub fn from_tree_entry(entry: &TreeEntry) -> Self {
        Self::new(entry.name.clone(), entry.object_id, entry.mode, 0)
    }

    /// Create an intent-to-add placeholder pointing at the empty blob.
    pub fn intent_to_add(path: impl Into<String>) -> Self {
        let mut entry = Self::new(path, Blob::empty_id(), EntryMode::Regular, 0);
        entry.flags.intent_to_add = true;
        entry
    }

    /// Create an unmerged entry at `stage`.
    pub fn conflict(
        path: impl Into<String>,
        object_id: ObjectId,
        mode: EntryMode,
        stage: Stage,
    ) -> Self {
        let mut entry = Self::new(path, object_id, mode, 0);
        entry.stage = stage;
        entry
    }

    /// Returns `true` for stage-0 entries.
    pub fn is_merged(&self) -> bool {
        self.stage == Stage::Merged
    }

    /// Returns `true` for intent-to-add placeholders.
    pub fn is_intent_to_add(&self) -> bool {
        self.flags.intent_to_add
    }

    /// Returns `true` if this merged, non-placeholder entry stages exactly
    /// the content of `tree_entry`.
    pub fn matches_tree_entry(&self, tree_entry: &TreeEntry) -> bool {
        self.is_merged()
            && !self.is_intent_to_add()
            && self.mode == tree_entry.mode
            && self.object_id == tree_entry.object_id
    }

    /// The flattened tree entry this index entry stages.
    pub fn to_tree_entry(&self) -> TreeEntry {
        TreeEntry::new(self.mode, self.path.clone(), self.object_id)
    }
}
