//! Content-addressed object storage for rewind.
//!
//! A hash-keyed object store analogous to git's `.git/objects/` directory.
//! Every blob, tree, commit and tag is an immutable object identified by its
//! BLAKE3 hash, domain-separated by object kind.
//!
//! # Object Types
//!
//! - [`Blob`] -- raw file content
//! - [`Tree`] -- directory listing mapping names to object references
//! - [`Commit`] -- root tree plus parents and message
//! - [`TagObject`] -- annotated tag pointing at another object
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Tree entries are sorted by name; nested directories are subtrees.
//! 3. The canonical empty tree is always readable, written or not.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod object;
pub mod traits;
pub mod walk;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectStore;
pub use object::{
    Blob, Commit, EntryMode, ObjectKind, StoredObject, TagObject, Tree, TreeEntry,
};
pub use traits::ObjectStore;
pub use walk::{flatten_tree, split_path, TreeBuilder};
