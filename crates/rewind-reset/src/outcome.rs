//! What a reset did.

use std::fmt;

use rewind_merge::CheckoutReport;
use rewind_refs::Expected;
use rewind_types::ObjectId;

use crate::mode::ResetMode;

/// A failure after the reset started mutating state.
///
/// Unlike [`ResetError`](crate::ResetError) these leave some state behind;
/// each variant documents what.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ResetFailure {
    /// A keep reset found paths changed both locally and between `HEAD` and
    /// the target. Index, working files and `HEAD` are unchanged. Paths are
    /// in name order.
    #[error("entries not uptodate, cannot merge: {}", .paths.join(", "))]
    StructuralConflict { paths: Vec<String> },

    /// Working files could not be updated. The index was not committed and
    /// `HEAD` did not move, but files written before the failure remain.
    #[error("could not update working tree: {reason}")]
    WorktreeUpdate { reason: String },

    /// `HEAD` moved between being read and being written. The index has
    /// already been committed.
    #[error("{name} moved concurrently: expected {expected}, found {}", display_id(.actual))]
    ConcurrentPointerMutation {
        name: String,
        expected: Expected,
        actual: Option<ObjectId>,
    },
}

fn display_id(id: &Option<ObjectId>) -> String {
    id.map_or_else(|| "nothing".to_string(), |id| id.short_hex())
}

/// A working file that differs from the index after a mixed reset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnstagedChange {
    Modified(String),
    Deleted(String),
    /// Staged only as an intent-to-add placeholder.
    Added(String),
}

impl UnstagedChange {
    pub fn path(&self) -> &str {
        match self {
            Self::Modified(p) | Self::Deleted(p) | Self::Added(p) => p,
        }
    }
}

impl fmt::Display for UnstagedChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            Self::Modified(_) => 'M',
            Self::Deleted(_) => 'D',
            Self::Added(_) => 'A',
        };
        write!(f, "{status}\t{}", self.path())
    }
}

/// The result of a reset that got past its preconditions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResetOutcome {
    pub mode: ResetMode,
    /// The revision as given (`HEAD` when implicit).
    pub rev: String,
    /// Tree the index was reset to.
    pub tree: ObjectId,
    /// Dereferenced `HEAD` before the reset.
    pub head_before: Option<ObjectId>,
    /// Dereferenced `HEAD` after the reset.
    pub head_after: Option<ObjectId>,
    /// Whether a new index was written.
    pub index_committed: bool,
    /// Working-file changes made by the reset.
    pub checkout: CheckoutReport,
    /// Files that differ from the new index (mixed resets with a work tree).
    pub unstaged: Vec<UnstagedChange>,
    /// Human-readable report lines. Empty when quiet.
    pub messages: Vec<String>,
    /// Non-fatal warnings, always collected.
    pub warnings: Vec<String>,
    pub failure: Option<ResetFailure>,
}

impl ResetOutcome {
    pub(crate) fn new(mode: ResetMode, rev: &str, tree: ObjectId, head: Option<ObjectId>) -> Self {
        Self {
            mode,
            rev: rev.to_string(),
            tree,
            head_before: head,
            head_after: head,
            index_committed: false,
            checkout: CheckoutReport::default(),
            unstaged: Vec::new(),
            messages: Vec::new(),
            warnings: Vec::new(),
            failure: None,
        }
    }

    /// Returns `true` if no failure was recorded.
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Process exit status: `0` on success, `1` on failure.
    pub fn status(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}
