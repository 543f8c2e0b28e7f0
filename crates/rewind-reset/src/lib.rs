//! Reset engine for rewind.
//!
//! Moves some subset of {`HEAD`, index, working files} to a target snapshot,
//! keeping the previous `HEAD` in `ORIG_HEAD` so the move can be undone.
//! Either a reset fails up front with a [`ResetError`] and nothing changes,
//! or it runs and reports what happened in a [`ResetOutcome`].
//!
//! ```
//! use rewind_index::Pathspec;
//! use rewind_reset::{Repository, ResetMode, ResetOptions};
//!
//! let repo = Repository::in_memory().unwrap();
//! // On an unborn branch a reset simply clears the index.
//! let outcome = repo
//!     .reset(None, Some(ResetMode::Mixed), &Pathspec::all(), &ResetOptions::default())
//!     .unwrap();
//! assert_eq!(outcome.status(), 0);
//! ```
//!
//! # Key Types
//!
//! - [`Repository`] -- The stores a reset operates on, and [`Repository::reset`]
//! - [`ResetMode`] / [`ModeEffects`] -- soft, mixed, hard, merge, keep
//! - [`Resolver`] -- Revision strings to commits and trees
//! - [`ResetOutcome`] / [`ResetFailure`] -- What a reset did, or where it stopped
//! - [`ResetConfig`] / [`ResetOptions`] -- Settings and per-call options

pub mod config;
pub mod engine;
pub mod error;
pub mod mode;
pub mod outcome;
pub mod partial;
pub mod resolve;
pub mod transition;

pub use config::{ResetConfig, ResetOptions, REFLOG_ACTION_ENV};
pub use engine::Repository;
pub use error::{ConfigError, ResetError, ResetResult, StorageError};
pub use mode::{IndexStrategy, ModeEffects, ResetMode};
pub use outcome::{ResetFailure, ResetOutcome, UnstagedChange};
pub use partial::reset_paths;
pub use resolve::{Resolver, Target};
pub use transition::{move_head, Transition};
