//! Staged-entry index for rewind.
//!
//! Tracks the staged content of every path, including unresolved conflict
//! stages, and memoizes per-directory tree ids in a cache tree. Persistence
//! goes through the [`IndexStore`] trait; writers hold an [`IndexLock`] that
//! is released exactly once, by commit or by drop.
//!
//! # Key Types
//!
//! - [`Index`] -- The in-memory staging area (BTreeMap-backed)
//! - [`IndexEntry`] -- A staged path at one [`Stage`], with [`IndexFlags`]
//! - [`CacheTree`] -- Memoized directory tree ids
//! - [`Pathspec`] -- Literal path / directory-prefix filter
//! - [`IndexStore`] -- Storage backend; [`InMemoryIndexStore`], [`FileIndexStore`]
//! - [`IndexLock`] -- Scoped exclusive lock carrying the index being rewritten

pub mod cache_tree;
pub mod entry;
pub mod error;
pub mod index;
pub mod pathspec;
pub mod store;

pub use cache_tree::CacheTree;
pub use entry::{IndexEntry, IndexFlags, Stage};
pub use error::{IndexError, IndexResult};
pub use index::Index;
pub use pathspec::Pathspec;
pub use store::{FileIndexStore, InMemoryIndexStore, IndexLock, IndexStore};
