//! Working-tree access for rewind.
//!
//! The reset engine never touches the filesystem directly; it goes through
//! the [`Worktree`] trait. Paths are slash-separated and relative to the
//! worktree root.
//!
//! # Key Types
//!
//! - [`Worktree`] -- read / write / remove files, content matching, submodules
//! - [`InMemoryWorktree`] -- map-backed tree for tests and embedding
//! - [`DiskWorktree`] -- real directory, atomic replace via temp files

pub mod disk;
pub mod error;
pub mod memory;
pub mod traits;

pub use disk::DiskWorktree;
pub use error::{WorktreeError, WorktreeResult};
pub use memory::InMemoryWorktree;
pub use traits::Worktree;
