//! Tree merger for rewind.
//!
//! Rewrites an index to match one or two input trees and optionally brings
//! the working files along. Merges are structural: entries are compared by
//! mode and object id, file contents are never merged.
//!
//! # Key Types
//!
//! - [`one_way`] -- Replace index entries with a target tree's
//! - [`two_way`] -- Move from a base tree to a target tree, keeping local
//!   index changes, or report every conflicting path
//! - [`update_worktree`] / [`UpdateMode`] / [`CheckoutReport`] -- Apply an
//!   index rewrite to the working files
//! - [`SubmodulePolicy`] -- Whether gitlink entries are checked out

pub mod checkout;
pub mod error;
pub mod one_way;
pub mod two_way;

pub use checkout::{update_worktree, CheckoutReport, SubmodulePolicy, UpdateMode};
pub use error::{MergeError, MergeResult};
pub use one_way::one_way;
pub use two_way::two_way;
