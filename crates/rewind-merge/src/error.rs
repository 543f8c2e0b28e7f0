//! Error types for the merge crate.

/// Errors that can occur while merging trees into the index.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// The two-way merge found paths changed both locally and in the target.
    /// Paths are in name order.
    #[error("structural conflict at {}", .paths.join(", "))]
    Conflict { paths: Vec<String> },

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] rewind_store::StoreError),

    /// Index operation failed.
    #[error("index error: {0}")]
    Index(#[from] rewind_index::IndexError),

    /// A working file could not be updated.
    #[error("worktree error: {0}")]
    Worktree(#[from] rewind_worktree::WorktreeError),
}

/// Convenience alias for merge results.
pub type MergeResult<T> = Result<T, MergeError>;
