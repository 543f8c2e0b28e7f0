//! Error types for the reset engine.
//!
//! [`ResetError`] is fatal: it is returned before anything observable has
//! changed. Failures that happen once mutation has begun are reported in
//! [`ResetOutcome`](crate::ResetOutcome) as a [`ResetFailure`](crate::ResetFailure).

use rewind_diff::DiffError;
use rewind_index::IndexError;
use rewind_merge::MergeError;
use rewind_refs::RefError;
use rewind_store::StoreError;
use rewind_worktree::WorktreeError;

use crate::mode::ResetMode;

/// Fatal reset errors.
#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    /// The combination of arguments is not allowed.
    #[error("usage: {0}")]
    Usage(String),

    /// The revision does not name a suitable object.
    #[error("failed to resolve '{rev}': {reason}")]
    UnresolvableRevision { rev: String, reason: String },

    /// The index holds conflict stages or a merge is in progress.
    #[error("cannot do a {mode} reset in the middle of a merge")]
    UnmergedState { mode: ResetMode },

    /// The mode updates working files but the repository has none.
    #[error("{mode} reset requires a work tree")]
    NoWorkTree { mode: ResetMode },

    /// The mode is not allowed in a bare repository.
    #[error("{mode} reset is not allowed in a bare repository")]
    BareRepository { mode: ResetMode },

    /// A keep reset needs `HEAD` as its merge base.
    #[error("you do not have a valid HEAD")]
    NoValidHead,

    /// Another process holds the index lock.
    #[error("index is locked: {0}")]
    IndexLocked(String),

    /// A backing store could not be read or written.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Failures of the stores underneath the engine.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object store: {0}")]
    Objects(#[from] StoreError),

    #[error("ref store: {0}")]
    Refs(#[from] RefError),

    #[error("index: {0}")]
    Index(IndexError),

    #[error("diff: {0}")]
    Diff(#[from] DiffError),

    #[error("worktree: {0}")]
    Worktree(#[from] WorktreeError),

    #[error("tree merge: {0}")]
    Merge(#[from] MergeError),
}

impl From<IndexError> for ResetError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Locked(what) => Self::IndexLocked(what),
            other => Self::Storage(StorageError::Index(other)),
        }
    }
}

impl From<StoreError> for ResetError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.into())
    }
}

impl From<RefError> for ResetError {
    fn from(err: RefError) -> Self {
        Self::Storage(err.into())
    }
}

impl From<DiffError> for ResetError {
    fn from(err: DiffError) -> Self {
        Self::Storage(err.into())
    }
}

impl From<WorktreeError> for ResetError {
    fn from(err: WorktreeError) -> Self {
        Self::Storage(err.into())
    }
}

impl From<MergeError> for ResetError {
    fn from(err: MergeError) -> Self {
        match err {
            MergeError::Index(e) => e.into(),
            other => Self::Storage(other.into()),
        }
    }
}

/// Convenience alias for reset results.
pub type ResetResult<T> = Result<T, ResetError>;

/// Errors loading a [`ResetConfig`](crate::ResetConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
