//! Error types for working-tree operations.

/// Errors that can occur while reading or writing working files.
#[derive(Debug, thiserror::Error)]
pub enum WorktreeError {
    /// The path is malformed or escapes the worktree.
    #[error("invalid worktree path: {0}")]
    InvalidPath(String),

    /// A non-empty directory occupies the place of a file being written.
    #[error("directory in the way: {0}")]
    DirectoryInTheWay(String),

    /// A file occupies the place of a directory a write needs.
    #[error("file in the way: {0}")]
    FileInTheWay(String),

    /// I/O error.
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl WorktreeError {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias for worktree results.
pub type WorktreeResult<T> = Result<T, WorktreeError>;
