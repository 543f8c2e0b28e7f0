//! Reset modes and what each one touches.

use std::fmt;
use std::str::FromStr;

use rewind_merge::UpdateMode;
use serde::{Deserialize, Serialize};

/// How far a reset reaches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetMode {
    /// Move `HEAD` only.
    Soft,
    /// Move `HEAD` and rewrite the index. Working files are left alone.
    #[default]
    Mixed,
    /// Move `HEAD`, rewrite the index and overwrite working files.
    Hard,
    /// Like `Hard`, but files with local changes are kept.
    Merge,
    /// Move `HEAD` and carry local changes across, refusing if a locally
    /// changed path also differs between `HEAD` and the target.
    Keep,
}

/// How the index is rewritten.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexStrategy {
    /// The index is not touched.
    Untouched,
    /// One-way replace with the target tree.
    OneWay,
    /// Two-way merge from `HEAD`'s tree to the target, then a one-way pass.
    TwoWayThenOneWay,
}

/// The fixed set of effects a mode has.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModeEffects {
    pub index: IndexStrategy,
    /// `None` if working files are not updated.
    pub worktree: Option<UpdateMode>,
    /// Seed the cache tree from the target after the index rewrite.
    pub prime_cache_tree: bool,
    /// Refuse to run on an index with conflict stages or a pending merge.
    pub rejects_unmerged: bool,
}

impl ModeEffects {
    /// Returns `true` if the mode needs a working tree.
    pub fn needs_worktree(&self) -> bool {
        self.worktree.is_some()
    }
}

impl ResetMode {
    /// Every mode, in the order they are usually listed.
    pub const ALL: [ResetMode; 5] = [
        ResetMode::Soft,
        ResetMode::Mixed,
        ResetMode::Hard,
        ResetMode::Merge,
        ResetMode::Keep,
    ];

    /// The lowercase mode name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Mixed => "mixed",
            Self::Hard => "hard",
            Self::Merge => "merge",
            Self::Keep => "keep",
        }
    }

    pub fn effects(self) -> ModeEffects {
        match self {
            Self::Soft => ModeEffects {
                index: IndexStrategy::Untouched,
                worktree: None,
                prime_cache_tree: false,
                rejects_unmerged: true,
            },
            Self::Mixed => ModeEffects {
                index: IndexStrategy::OneWay,
                worktree: None,
                prime_cache_tree: true,
                rejects_unmerged: false,
            },
            Self::Hard => ModeEffects {
                index: IndexStrategy::OneWay,
                worktree: Some(UpdateMode::Forced),
                prime_cache_tree: true,
                rejects_unmerged: false,
            },
            Self::Merge => ModeEffects {
                index: IndexStrategy::OneWay,
                worktree: Some(UpdateMode::Safe),
                prime_cache_tree: false,
                rejects_unmerged: false,
            },
            Self::Keep => ModeEffects {
                index: IndexStrategy::TwoWayThenOneWay,
                worktree: Some(UpdateMode::Safe),
                prime_cache_tree: true,
                rejects_unmerged: true,
            },
        }
    }
}

impl fmt::Display for ResetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResetMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| format!("unknown reset mode: {s}"))
    }
}
