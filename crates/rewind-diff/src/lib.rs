//! Structural diff engine for rewind.
//!
//! Compares an index with a flattened tree path by path, restricted by a
//! [`Pathspec`](rewind_index::Pathspec). No content-level diffing happens
//! here: two entries differ when their mode or object id differ.
//!
//! # Key Types
//!
//! - [`TreeDiff`] / [`TreeChange`] -- Path-level change set
//! - [`diff_index_to_tree`] -- Staged index vs a target tree

pub mod error;
pub mod index_diff;
pub mod tree_diff;

pub use error::{DiffError, DiffResult};
pub use index_diff::diff_index_to_tree;
pub use tree_diff::{TreeChange, TreeDiff};
