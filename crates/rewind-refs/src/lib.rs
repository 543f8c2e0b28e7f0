//! Pointer store for rewind.
//!
//! Named pointers (`HEAD`, `ORIG_HEAD`, `refs/heads/*`, ...) map to object
//! ids, or symbolically to another pointer. Every mutation is a
//! compare-and-swap against a previously observed value and leaves an entry
//! in an append-only journal describing why the pointer moved.
//!
//! # Modules
//!
//! - [`error`] — Error types for ref operations
//! - [`types`] — [`RefValue`], [`Expected`], [`JournalEntry`]
//! - [`traits`] — The [`RefStore`] and [`RefJournal`] interfaces
//! - [`names`] — Ref name validation and well-known pointer names
//! - [`memory`] — In-memory [`InMemoryRefStore`] and [`InMemoryJournal`]
//! - [`journal`] — Crash-tolerant on-disk [`FileJournal`]

pub mod error;
pub mod journal;
pub mod memory;
pub mod names;
pub mod traits;
pub mod types;

pub use error::{RefError, Result};
pub use journal::FileJournal;
pub use memory::{InMemoryJournal, InMemoryRefStore};
pub use names::{validate_ref_name, BRANCH_STATE_REFS, HEAD, MERGE_HEAD, ORIG_HEAD};
pub use traits::{RefJournal, RefStore};
pub use types::{Expected, JournalEntry, RefValue};
