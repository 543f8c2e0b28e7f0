//! Error types for reference operations.

use rewind_types::ObjectId;
use thiserror::Error;

use crate::types::Expected;

/// Errors that can occur during reference operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// The ref name is malformed.
    #[error("invalid ref name: {name}: {reason}")]
    InvalidName { name: String, reason: String },

    /// A compare-and-swap found a different value than the caller expected.
    #[error("ref {name} moved concurrently: expected {expected}, found {}", display_actual(.actual))]
    CasMismatch {
        name: String,
        expected: Expected,
        actual: Option<ObjectId>,
    },

    /// Symbolic refs nest too deeply or form a cycle.
    #[error("symbolic ref loop at {name}")]
    SymbolicLoop { name: String },

    /// The journal could not be decoded.
    #[error("corrupt journal: {0}")]
    CorruptJournal(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error during file-based operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn display_actual(actual: &Option<ObjectId>) -> String {
    match actual {
        Some(id) => id.short_hex(),
        None => "nothing".to_string(),
    }
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
