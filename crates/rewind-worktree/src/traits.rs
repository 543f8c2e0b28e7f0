//! The [`Worktree`] trait.

use rewind_store::{Blob, EntryMode};
use rewind_types::ObjectId;
use tracing::debug;

use crate::error::WorktreeResult;

/// Access to the files of a working tree.
///
/// Implementations must be thread-safe (`Send + Sync`).
pub trait Worktree: Send + Sync {
    /// Read the content of the file at `path`, or `None` if absent.
    fn read_file(&self, path: &str) -> WorktreeResult<Option<Vec<u8>>>;

    /// Create or replace the file at `path`. Parent directories are created
    /// as needed and the replacement is atomic.
    fn write_file(&self, path: &str, data: &[u8], mode: EntryMode) -> WorktreeResult<()>;

    /// Remove the file at `path` and prune parent directories left empty.
    ///
    /// Returns `Ok(false)` if there was nothing to remove.
    fn remove_file(&self, path: &str) -> WorktreeResult<bool>;

    /// Returns `true` if the file at `path` holds exactly the blob `id`.
    fn matches(&self, path: &str, id: &ObjectId) -> WorktreeResult<bool> {
        Ok(self
            .read_file(path)?
            .is_some_and(|data| Blob::id_for(&data) == *id))
    }

    /// Check out `commit` in the submodule at `path`.
    ///
    /// Worktrees without submodule support accept the request and do
    /// nothing.
    fn checkout_submodule(&self, path: &str, commit: &ObjectId) -> WorktreeResult<()> {
        debug!(path, commit = %commit.short_hex(), "submodule checkout not supported; skipped");
        Ok(())
    }
}
