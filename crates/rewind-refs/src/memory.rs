//! In-memory pointer store and journal for testing and ephemeral use.
//!
//! [`InMemoryRefStore`] stores all refs in a `HashMap` protected by a
//! `RwLock`; every mutation takes the write lock for its whole
//! check-journal-write sequence, which is what makes the compare-and-swap
//! atomic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use rewind_types::ObjectId;
use tracing::debug;

use crate::error::{RefError, Result};
use crate::names::validate_ref_name;
use crate::traits::{RefJournal, RefStore, MAX_SYMREF_DEPTH};
use crate::types::{Expected, JournalEntry, RefValue};

fn poisoned<E: std::fmt::Display>(e: E) -> RefError {
    RefError::Serialization(format!("lock poisoned: {e}"))
}

/// An in-memory, append-only [`RefJournal`].
#[derive(Debug, Default)]
pub struct InMemoryJournal {
    entries: Mutex<Vec<JournalEntry>>,
}

impl InMemoryJournal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records across all names.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Returns `true` if nothing has been journaled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RefJournal for InMemoryJournal {
    fn append(&self, entry: &JournalEntry) -> Result<()> {
        self.entries.lock().map_err(poisoned)?.push(entry.clone());
        Ok(())
    }

    fn entries(&self, name: &str) -> Result<Vec<JournalEntry>> {
        let entries = self.entries.lock().map_err(poisoned)?;
        Ok(entries.iter().filter(|e| e.name == name).cloned().collect())
    }
}

/// An in-memory implementation of [`RefStore`].
///
/// Data is lost when the store is dropped, unless the journal was supplied
/// by the caller (see [`InMemoryRefStore::with_journal`]).
pub struct InMemoryRefStore {
    refs: RwLock<HashMap<String, RefValue>>,
    journal: Arc<dyn RefJournal>,
}

impl InMemoryRefStore {
    /// Create a new empty ref store with an in-memory journal.
    pub fn new() -> Self {
        Self::with_journal(Arc::new(InMemoryJournal::new()))
    }

    /// Create a new empty ref store that journals into `journal`.
    pub fn with_journal(journal: Arc<dyn RefJournal>) -> Self {
        Self {
            refs: RwLock::new(HashMap::new()),
            journal,
        }
    }
}

impl Default for InMemoryRefStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryRefStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.refs.read().map(|r| r.len()).unwrap_or(0);
        f.debug_struct("InMemoryRefStore")
            .field("ref_count", &count)
            .finish()
    }
}

/// Follow symbolic refs inside an already-held lock.
fn resolve_locked(refs: &HashMap<String, RefValue>, name: &str) -> Result<String> {
    let mut current = name.to_string();
    for _ in 0..=MAX_SYMREF_DEPTH {
        match refs.get(&current) {
            Some(RefValue::Symbolic(target)) => current = target.clone(),
            _ => return Ok(current),
        }
    }
    Err(RefError::SymbolicLoop {
        name: name.to_string(),
    })
}

impl RefStore for InMemoryRefStore {
    fn read_ref(&self, name: &str) -> Result<Option<RefValue>> {
        let refs = self.refs.read().map_err(poisoned)?;
        Ok(refs.get(name).cloned())
    }

    fn update_ref(
        &self,
        name: &str,
        new: ObjectId,
        expected: Expected,
        message: &str,
    ) -> Result<()> {
        validate_ref_name(name)?;
        let mut refs = self.refs.write().map_err(poisoned)?;

        let target = resolve_locked(&refs, name)?;
        validate_ref_name(&target)?;
        let current = refs.get(&target).and_then(RefValue::as_direct);
        if !expected.matches(current) {
            return Err(RefError::CasMismatch {
                name: name.to_string(),
                expected,
                actual: current,
            });
        }

        self.journal
            .append(&JournalEntry::new(&target, current, Some(new), message))?;
        if target != name {
            self.journal
                .append(&JournalEntry::new(name, current, Some(new), message))?;
        }
        refs.insert(target.clone(), RefValue::Direct(new));

        debug!(name, target = %target, new = %new.short_hex(), "ref updated");
        Ok(())
    }

    fn delete_ref(&self, name: &str, expected: Expected, message: Option<&str>) -> Result<bool> {
        validate_ref_name(name)?;
        let mut refs = self.refs.write().map_err(poisoned)?;

        let current = match refs.get(name) {
            Some(RefValue::Direct(id)) => Some(*id),
            Some(RefValue::Symbolic(_)) => {
                let target = resolve_locked(&refs, name)?;
                refs.get(&target).and_then(RefValue::as_direct)
            }
            None => None,
        };
        if !expected.matches(current) {
            return Err(RefError::CasMismatch {
                name: name.to_string(),
                expected,
                actual: current,
            });
        }

        if let Some(message) = message {
            self.journal
                .append(&JournalEntry::new(name, current, None, message))?;
        }
        let existed = refs.remove(name).is_some();
        if existed {
            debug!(name, "ref deleted");
        }
        Ok(existed)
    }

    fn set_symbolic_ref(&self, name: &str, target: &str) -> Result<()> {
        validate_ref_name(name)?;
        validate_ref_name(target)?;
        let mut refs = self.refs.write().map_err(poisoned)?;
        refs.insert(name.to_string(), RefValue::Symbolic(target.to_string()));
        Ok(())
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, RefValue)>> {
        let refs = self.refs.read().map_err(poisoned)?;
        let mut result: Vec<(String, RefValue)> = refs
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        result.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(result)
    }

    fn journal(&self) -> &dyn RefJournal {
        self.journal.as_ref()
    }
}
