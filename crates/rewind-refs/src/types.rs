//! Core pointer types.

use std::fmt;

use chrono::{DateTime, Utc};
use rewind_types::ObjectId;
use serde::{Deserialize, Serialize};

/// The stored value of a pointer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefValue {
    /// Points directly at an object.
    Direct(ObjectId),
    /// Names another pointer (e.g. `HEAD` -> `refs/heads/main`).
    Symbolic(String),
}

impl RefValue {
    /// The object id for direct values.
    pub fn as_direct(&self) -> Option<ObjectId> {
        match self {
            Self::Direct(id) => Some(*id),
            Self::Symbolic(_) => None,
        }
    }
}

/// The prior value a compare-and-swap write requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expected {
    /// No check; used for unconditional setup writes.
    Any,
    /// The pointer must not exist.
    Absent,
    /// The pointer must currently hold this id.
    Value(ObjectId),
}

impl Expected {
    /// Expect exactly the observed state: `Value` if present, `Absent` if not.
    pub fn observed(current: Option<ObjectId>) -> Self {
        match current {
            Some(id) => Self::Value(id),
            None => Self::Absent,
        }
    }

    /// Returns `true` if `current` satisfies this expectation.
    pub fn matches(&self, current: Option<ObjectId>) -> bool {
        match self {
            Self::Any => true,
            Self::Absent => current.is_none(),
            Self::Value(id) => current == Some(*id),
        }
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any value"),
            Self::Absent => write!(f, "no value"),
            Self::Value(id) => write!(f, "{}", id.short_hex()),
        }
    }
}

/// One journal record: a single pointer mutation and its cause.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Pointer that moved.
    pub name: String,
    /// Value before the mutation.
    pub old: Option<ObjectId>,
    /// Value after the mutation (`None` for deletions).
    pub new: Option<ObjectId>,
    /// Human-readable cause, e.g. `"reset: moving to HEAD~1"`.
    pub message: String,
    /// When the mutation happened.
    pub timestamp: DateTime<Utc>,
}

impl JournalEntry {
    /// Create an entry stamped with the current time.
    pub fn new(
        name: impl Into<String>,
        old: Option<ObjectId>,
        new: Option<ObjectId>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            old,
            new,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}
