//! Working tree backed by a real directory.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rewind_store::{split_path, EntryMode};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{WorktreeError, WorktreeResult};
use crate::traits::Worktree;

/// A [`Worktree`] rooted at a directory on disk.
///
/// Writes go to a temporary file in the target directory which is then
/// renamed into place, so readers never observe a partially written file.
#[derive(Debug, Clone)]
pub struct DiskWorktree {
    root: PathBuf,
}

impl DiskWorktree {
    /// Open the worktree rooted at `root`, which must be a directory.
    pub fn open(root: &Path) -> WorktreeResult<Self> {
        let meta = fs::metadata(root).map_err(|e| WorktreeError::io(root.display().to_string(), e))?;
        if !meta.is_dir() {
            return Err(WorktreeError::InvalidPath(root.display().to_string()));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// The worktree root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> WorktreeResult<PathBuf> {
        let parts = split_path(path).map_err(|_| WorktreeError::InvalidPath(path.to_string()))?;
        let mut full = self.root.clone();
        full.extend(parts);
        Ok(full)
    }

    /// Create the missing ancestors of `full`. A file standing where a
    /// directory must go is left alone and reported.
    fn prepare_parents(&self, path: &str, full: &Path) -> WorktreeResult<()> {
        let Some(parent) = full.parent() else {
            return Ok(());
        };
        let mut current = self.root.clone();
        if let Ok(rel) = parent.strip_prefix(&self.root) {
            for component in rel.components() {
                current.push(component);
                match fs::symlink_metadata(&current) {
                    Ok(meta) if !meta.is_dir() => {
                        let blocking = current.strip_prefix(&self.root).unwrap_or(&current);
                        return Err(WorktreeError::FileInTheWay(
                            blocking.to_string_lossy().replace('\\', "/"),
                        ));
                    }
                    Ok(_) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(WorktreeError::io(path, e)),
                }
            }
        }
        fs::create_dir_all(parent).map_err(|e| WorktreeError::io(path, e))
    }

    /// Returns `true` if some ancestor of `full` below the root is not a
    /// directory, in which case `full` cannot exist.
    fn has_file_ancestor(&self, full: &Path) -> bool {
        full.ancestors()
            .skip(1)
            .take_while(|a| *a != self.root.as_path() && a.starts_with(&self.root))
            .any(|a| fs::symlink_metadata(a).is_ok_and(|m| !m.is_dir()))
    }

    /// Remove empty directories from `dir` up to (not including) the root.
    fn prune_empty_dirs(&self, mut dir: Option<&Path>) {
        while let Some(d) = dir {
            if d == self.root.as_path() || !d.starts_with(&self.root) {
                break;
            }
            if fs::remove_dir(d).is_err() {
                break;
            }
            debug!(dir = %d.display(), "pruned empty directory");
            dir = d.parent();
        }
    }
}

impl Worktree for DiskWorktree {
    fn read_file(&self, path: &str) -> WorktreeResult<Option<Vec<u8>>> {
        let full = self.resolve(path)?;
        let meta = match fs::symlink_metadata(&full) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(_) if self.has_file_ancestor(&full) => return Ok(None),
            Err(e) => return Err(WorktreeError::io(path, e)),
        };
        if meta.file_type().is_symlink() {
            let target = fs::read_link(&full).map_err(|e| WorktreeError::io(path, e))?;
            return Ok(Some(target.to_string_lossy().into_owned().into_bytes()));
        }
        if meta.is_dir() {
            return Ok(None);
        }
        fs::read(&full)
            .map(Some)
            .map_err(|e| WorktreeError::io(path, e))
    }

    fn write_file(&self, path: &str, data: &[u8], mode: EntryMode) -> WorktreeResult<()> {
        let full = self.resolve(path)?;
        self.prepare_parents(path, &full)?;

        if let Ok(meta) = fs::symlink_metadata(&full) {
            if meta.is_dir() {
                fs::remove_dir(&full).map_err(|_| WorktreeError::DirectoryInTheWay(path.to_string()))?;
            }
        }

        if mode == EntryMode::Symlink {
            return write_symlink(path, &full, data);
        }

        let dir = full
            .parent()
            .ok_or_else(|| WorktreeError::InvalidPath(path.to_string()))?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| WorktreeError::io(path, e))?;
        tmp.write_all(data).map_err(|e| WorktreeError::io(path, e))?;
        set_executable(tmp.as_file(), mode == EntryMode::Executable)
            .map_err(|e| WorktreeError::io(path, e))?;
        tmp.persist(&full)
            .map_err(|e| WorktreeError::io(path, e.error))?;

        debug!(path, len = data.len(), "worktree file written");
        Ok(())
    }

    fn remove_file(&self, path: &str) -> WorktreeResult<bool> {
        let full = self.resolve(path)?;
        match fs::symlink_metadata(&full) {
            Ok(meta) if meta.is_dir() => return Ok(false),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(WorktreeError::io(path, e)),
        }
        fs::remove_file(&full).map_err(|e| WorktreeError::io(path, e))?;
        self.prune_empty_dirs(full.parent());
        Ok(true)
    }
}

#[cfg(unix)]
fn set_executable(file: &fs::File, executable: bool) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let bits = if executable { 0o755 } else { 0o644 };
    file.set_permissions(fs::Permissions::from_mode(bits))
}

#[cfg(not(unix))]
fn set_executable(_file: &fs::File, _executable: bool) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn write_symlink(path: &str, full: &Path, target: &[u8]) -> WorktreeResult<()> {
    let target = String::from_utf8_lossy(target).into_owned();
    match fs::remove_file(full) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(WorktreeError::io(path, e)),
    }
    std::os::unix::fs::symlink(target, full).map_err(|e| WorktreeError::io(path, e))
}

#[cfg(not(unix))]
fn write_symlink(path: &str, full: &Path, target: &[u8]) -> WorktreeResult<()> {
    // Without symlink support the link target is stored as a plain file.
    fs::write(full, target).map_err(|e| WorktreeError::io(path, e))
}
