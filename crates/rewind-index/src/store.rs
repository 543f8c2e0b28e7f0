//! Index persistence and locking.
//!
//! Writers go through [`IndexLock`]: acquire reads the current index under an
//! exclusive lock, the holder mutates its copy, and [`IndexLock::commit`]
//! replaces the stored index atomically. Dropping an uncommitted lock
//! releases it and leaves the stored index untouched.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use tracing::{debug, warn};

use crate::error::{IndexError, IndexResult};
use crate::index::Index;

/// Storage backend for the index.
pub trait IndexStore: Send + Sync {
    /// Read the current index. A store that was never written yields an
    /// empty index.
    fn read(&self) -> IndexResult<Index>;

    /// Take the exclusive write lock, failing with [`IndexError::Locked`] if
    /// it is already held.
    fn acquire(&self) -> IndexResult<()>;

    /// Replace the stored index with `index` and release the lock.
    fn commit_locked(&self, index: &Index) -> IndexResult<()>;

    /// Release the lock without writing.
    fn release(&self);
}

/// Exclusive hold on an [`IndexStore`] together with the index being
/// rewritten. Released exactly once: by [`IndexLock::commit`] or on drop.
pub struct IndexLock<'a> {
    store: &'a dyn IndexStore,
    index: Index,
    held: bool,
}

impl<'a> IndexLock<'a> {
    /// Lock `store` and read its current contents.
    pub fn acquire(store: &'a dyn IndexStore) -> IndexResult<Self> {
        store.acquire()?;
        let mut lock = Self {
            store,
            index: Index::new(),
            held: true,
        };
        // On failure the guard drops here and releases the lock.
        lock.index = store.read()?;
        Ok(lock)
    }

    /// The index as currently staged in this lock.
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Mutable access to the staged index.
    pub fn index_mut(&mut self) -> &mut Index {
        &mut self.index
    }

    /// Replace the staged index wholesale.
    pub fn replace(&mut self, index: Index) {
        self.index = index;
    }

    /// Persist the staged index and release the lock.
    pub fn commit(mut self) -> IndexResult<()> {
        self.store.commit_locked(&self.index)?;
        self.held = false;
        debug!(entries = self.index.len(), "index committed");
        Ok(())
    }
}

impl Drop for IndexLock<'_> {
    fn drop(&mut self) {
        if self.held {
            self.store.release();
            debug!("index lock released without commit");
        }
    }
}

impl std::fmt::Debug for IndexLock<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexLock")
            .field("entries", &self.index.len())
            .field("held", &self.held)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// An in-memory [`IndexStore`] for tests and embedding.
pub struct InMemoryIndexStore {
    index: RwLock<Index>,
    locked: AtomicBool,
}

impl InMemoryIndexStore {
    /// Create a store holding an empty index.
    pub fn new() -> Self {
        Self::with_index(Index::new())
    }

    /// Create a store holding `index`.
    pub fn with_index(index: Index) -> Self {
        Self {
            index: RwLock::new(index),
            locked: AtomicBool::new(false),
        }
    }

    /// Returns `true` while a writer holds the lock.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryIndexStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexStore for InMemoryIndexStore {
    fn read(&self) -> IndexResult<Index> {
        let index = self
            .index
            .read()
            .map_err(|e| IndexError::Serialization(format!("lock poisoned: {e}")))?;
        Ok(index.clone())
    }

    fn acquire(&self) -> IndexResult<()> {
        self.locked
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| IndexError::Locked("in-memory index".into()))
    }

    fn commit_locked(&self, index: &Index) -> IndexResult<()> {
        if !self.is_locked() {
            return Err(IndexError::NotLocked);
        }
        *self
            .index
            .write()
            .map_err(|e| IndexError::Serialization(format!("lock poisoned: {e}")))? = index.clone();
        self.locked.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) {
        self.locked.store(false, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for InMemoryIndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.index.read().map(|i| i.len()).unwrap_or(0);
        f.debug_struct("InMemoryIndexStore")
            .field("entries", &entries)
            .field("locked", &self.is_locked())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// File-backed
// ---------------------------------------------------------------------------

/// A file-backed [`IndexStore`].
///
/// The index is a bincode snapshot at `<dir>/index`. The lock is the file
/// `<dir>/index.lock`, created exclusively; commit writes the new snapshot
/// into the lock file and renames it over `index`.
#[derive(Debug)]
pub struct FileIndexStore {
    dir: PathBuf,
}

impl FileIndexStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: &Path) -> IndexResult<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Path of the index snapshot.
    pub fn index_path(&self) -> PathBuf {
        self.dir.join("index")
    }

    /// Path of the lock file.
    pub fn lock_path(&self) -> PathBuf {
        self.dir.join("index.lock")
    }
}

impl IndexStore for FileIndexStore {
    fn read(&self) -> IndexResult<Index> {
        let bytes = match fs::read(self.index_path()) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Index::new()),
            Err(e) => return Err(e.into()),
        };
        bincode::deserialize(&bytes).map_err(|e| IndexError::Serialization(e.to_string()))
    }

    fn acquire(&self) -> IndexResult<()> {
        let path = self.lock_path();
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(IndexError::Locked(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn commit_locked(&self, index: &Index) -> IndexResult<()> {
        let lock = self.lock_path();
        if !lock.exists() {
            return Err(IndexError::NotLocked);
        }
        let bytes =
            bincode::serialize(index).map_err(|e| IndexError::Serialization(e.to_string()))?;
        let mut file = File::create(&lock)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&lock, self.index_path())?;
        Ok(())
    }

    fn release(&self) {
        match fs::remove_file(self.lock_path()) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, "failed to remove index lock"),
        }
    }
}
