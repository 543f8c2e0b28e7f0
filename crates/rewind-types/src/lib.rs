//! Foundation types for rewind.
//!
//! Every other rewind crate depends on `rewind-types` for the identifier that
//! names blobs, trees, commits and tags.
//!
//! # Key Types
//!
//! - [`ObjectId`] — Content-addressed identifier (BLAKE3 hash)
//! - [`ContentHasher`] — Domain-separated hasher, one domain per object kind

pub mod error;
pub mod hasher;
pub mod object;

pub use error::TypeError;
pub use hasher::ContentHasher;
pub use object::ObjectId;
