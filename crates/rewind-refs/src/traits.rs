//! The [`RefStore`] and [`RefJournal`] traits.
//!
//! Any backend (in-memory, filesystem, database) implements [`RefStore`] to
//! provide pointer management with optimistic concurrency.

use rewind_types::ObjectId;

use crate::error::{RefError, Result};
use crate::types::{Expected, JournalEntry, RefValue};

/// Symbolic refs nest at most this deep.
pub const MAX_SYMREF_DEPTH: usize = 5;

/// Append-only sink for pointer mutation records.
pub trait RefJournal: Send + Sync {
    /// Append one record. Records are never rewritten.
    fn append(&self, entry: &JournalEntry) -> Result<()>;

    /// All records for `name`, oldest first.
    fn entries(&self, name: &str) -> Result<Vec<JournalEntry>>;
}

/// Storage backend for named pointers.
///
/// Implementations must be thread-safe (`Send + Sync`). Each mutating call
/// is atomic: the expectation check, the journal append and the write
/// happen under one critical section, so two racing writers observe each
/// other's effects and the loser gets [`RefError::CasMismatch`].
pub trait RefStore: Send + Sync {
    /// Read the raw value stored at `name` without following symbolic refs.
    ///
    /// Returns `Ok(None)` if the ref does not exist.
    fn read_ref(&self, name: &str) -> Result<Option<RefValue>>;

    /// Point `name` at `new`, provided its current (dereferenced) value
    /// satisfies `expected`.
    ///
    /// A symbolic `name` is followed: the ref it names is updated, and both
    /// names receive a journal entry with `message`.
    fn update_ref(&self, name: &str, new: ObjectId, expected: Expected, message: &str)
        -> Result<()>;

    /// Delete `name` itself (symbolic refs are not followed), provided its
    /// current value satisfies `expected`.
    ///
    /// Returns `Ok(true)` if the ref existed and was deleted.
    fn delete_ref(&self, name: &str, expected: Expected, message: Option<&str>) -> Result<bool>;

    /// Make `name` a symbolic ref naming `target`.
    fn set_symbolic_ref(&self, name: &str, target: &str) -> Result<()>;

    /// List all refs whose name starts with `prefix`, sorted by name.
    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, RefValue)>>;

    /// The journal this store appends to.
    fn journal(&self) -> &dyn RefJournal;

    /// Follow symbolic refs from `name` to the final ref name.
    fn resolve_name(&self, name: &str) -> Result<String> {
        let mut current = name.to_string();
        for _ in 0..=MAX_SYMREF_DEPTH {
            match self.read_ref(&current)? {
                Some(RefValue::Symbolic(target)) => current = target,
                _ => return Ok(current),
            }
        }
        Err(RefError::SymbolicLoop {
            name: name.to_string(),
        })
    }

    /// Resolve `name` to an object id, following symbolic refs.
    ///
    /// Returns `Ok(None)` for missing refs and for symbolic refs whose
    /// target does not exist yet (an unborn branch).
    fn resolve(&self, name: &str) -> Result<Option<ObjectId>> {
        let final_name = self.resolve_name(name)?;
        Ok(self
            .read_ref(&final_name)?
            .and_then(|value| value.as_direct()))
    }

    /// Returns `true` if `name` resolves to an object.
    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.resolve(name)?.is_some())
    }
}
