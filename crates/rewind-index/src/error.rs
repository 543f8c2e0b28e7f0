//! Error types for the index crate.

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The specified path was not found in the index.
    #[error("path not found in index: {0}")]
    PathNotFound(String),

    /// An invalid path was provided.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The index has unmerged entries and cannot be written as a tree.
    #[error("unresolved conflict at path: {0}")]
    UnresolvedConflict(String),

    /// Another writer holds the index lock.
    #[error("index is locked: {0}")]
    Locked(String),

    /// A locked-only operation was attempted without holding the lock.
    #[error("index lock is not held")]
    NotLocked,

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] rewind_store::StoreError),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error in a file-backed store.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
