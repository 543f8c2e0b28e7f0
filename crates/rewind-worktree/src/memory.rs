//! Map-backed working tree.

use std::collections::BTreeMap;
use std::sync::RwLock;

use rewind_store::{split_path, EntryMode};
use rewind_types::ObjectId;
use tracing::debug;

use crate::error::{WorktreeError, WorktreeResult};
use crate::traits::Worktree;

#[derive(Default)]
struct State {
    files: BTreeMap<String, (Vec<u8>, EntryMode)>,
    submodules: BTreeMap<String, ObjectId>,
}

/// An in-memory [`Worktree`].
///
/// Directories are implicit: a directory exists while some file lies below
/// it, so pruning happens automatically on removal.
#[derive(Default)]
pub struct InMemoryWorktree {
    state: RwLock<State>,
}

fn check_path(path: &str) -> WorktreeResult<()> {
    split_path(path)
        .map(|_| ())
        .map_err(|_| WorktreeError::InvalidPath(path.to_string()))
}

impl InMemoryWorktree {
    /// Create an empty worktree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a worktree holding the given regular files.
    pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a [u8])>) -> Self {
        let tree = Self::new();
        {
            let mut state = tree.state.write().expect("lock poisoned");
            for (path, data) in files {
                state
                    .files
                    .insert(path.to_string(), (data.to_vec(), EntryMode::Regular));
            }
        }
        tree
    }

    /// Snapshot of every file's content.
    pub fn files(&self) -> BTreeMap<String, Vec<u8>> {
        let state = self.state.read().expect("lock poisoned");
        state
            .files
            .iter()
            .map(|(p, (data, _))| (p.clone(), data.clone()))
            .collect()
    }

    /// Mode recorded for the file at `path`.
    pub fn mode_of(&self, path: &str) -> Option<EntryMode> {
        let state = self.state.read().expect("lock poisoned");
        state.files.get(path).map(|(_, mode)| *mode)
    }

    /// Commit most recently checked out in the submodule at `path`.
    pub fn submodule(&self, path: &str) -> Option<ObjectId> {
        let state = self.state.read().expect("lock poisoned");
        state.submodules.get(path).copied()
    }
}

impl Worktree for InMemoryWorktree {
    fn read_file(&self, path: &str) -> WorktreeResult<Option<Vec<u8>>> {
        check_path(path)?;
        let state = self.state.read().expect("lock poisoned");
        Ok(state.files.get(path).map(|(data, _)| data.clone()))
    }

    fn write_file(&self, path: &str, data: &[u8], mode: EntryMode) -> WorktreeResult<()> {
        check_path(path)?;
        let mut state = self.state.write().expect("lock poisoned");

        let below = format!("{path}/");
        if state.files.keys().any(|p| p.starts_with(&below)) {
            return Err(WorktreeError::DirectoryInTheWay(path.to_string()));
        }
        if let Some((i, _)) = path
            .match_indices('/')
            .find(|(i, _)| state.files.contains_key(&path[..*i]))
        {
            return Err(WorktreeError::FileInTheWay(path[..i].to_string()));
        }
        state.files.insert(path.to_string(), (data.to_vec(), mode));
        debug!(path, len = data.len(), "worktree file written");
        Ok(())
    }

    fn remove_file(&self, path: &str) -> WorktreeResult<bool> {
        check_path(path)?;
        let mut state = self.state.write().expect("lock poisoned");
        Ok(state.files.remove(path).is_some())
    }

    fn checkout_submodule(&self, path: &str, commit: &ObjectId) -> WorktreeResult<()> {
        check_path(path)?;
        let mut state = self.state.write().expect("lock poisoned");
        state.submodules.insert(path.to_string(), *commit);
        debug!(path, commit = %commit.short_hex(), "submodule checked out");
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryWorktree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.state.read().map(|s| s.files.len()).unwrap_or(0);
        f.debug_struct("InMemoryWorktree")
            .field("files", &count)
            .finish()
    }
}
