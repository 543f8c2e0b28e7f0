//! Ref name validation following git-style conventions.
//!
//! Two shapes are accepted:
//! - pseudo pointers: all-caps names such as `HEAD` or `ORIG_HEAD`
//! - hierarchical refs under `refs/`, whose components follow the usual
//!   branch-name rules (no `..`, no `@{`, no control or glob characters, no
//!   component starting with `.`, no trailing `.lock`)

use crate::error::{RefError, Result};

/// The current-head pointer.
pub const HEAD: &str = "HEAD";
/// The undo pointer written before `HEAD` moves.
pub const ORIG_HEAD: &str = "ORIG_HEAD";
/// Present while a merge is in progress.
pub const MERGE_HEAD: &str = "MERGE_HEAD";
/// Present while a cherry-pick is in progress.
pub const CHERRY_PICK_HEAD: &str = "CHERRY_PICK_HEAD";
/// Present while a revert is in progress.
pub const REVERT_HEAD: &str = "REVERT_HEAD";

/// Pointers describing an in-progress multi-step operation. A full reset
/// abandons that operation by deleting all of them.
pub const BRANCH_STATE_REFS: &[&str] = &[MERGE_HEAD, CHERRY_PICK_HEAD, REVERT_HEAD];

/// Characters that are forbidden anywhere in a ref name.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

fn invalid(name: &str, reason: impl Into<String>) -> RefError {
    RefError::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Returns `true` for all-caps pseudo pointer names like `ORIG_HEAD`.
pub fn is_pseudo_ref(name: &str) -> bool {
    !name.is_empty()
        && name.starts_with(|c: char| c.is_ascii_uppercase())
        && name.chars().all(|c| c.is_ascii_uppercase() || c == '_')
}

/// Validate a ref name, returning `Ok(())` if it can be stored.
///
/// # Examples
///
/// ```
/// use rewind_refs::names::validate_ref_name;
///
/// assert!(validate_ref_name("HEAD").is_ok());
/// assert!(validate_ref_name("refs/heads/feature/auth").is_ok());
/// assert!(validate_ref_name("refs/heads/bad..name").is_err());
/// assert!(validate_ref_name("main").is_err());
/// ```
pub fn validate_ref_name(name: &str) -> Result<()> {
    if is_pseudo_ref(name) {
        return Ok(());
    }
    let Some(rest) = name.strip_prefix("refs/") else {
        return Err(invalid(name, "must be an all-caps pointer or start with 'refs/'"));
    };
    if rest.is_empty() {
        return Err(invalid(name, "missing name after 'refs/'"));
    }

    if let Some(ch) = FORBIDDEN_CHARS.iter().find(|ch| name.contains(**ch)) {
        return Err(invalid(name, format!("contains forbidden character: {ch:?}")));
    }
    if name.contains("..") {
        return Err(invalid(name, "must not contain '..'"));
    }
    if name.contains("@{") {
        return Err(invalid(name, "must not contain '@{'"));
    }
    if name.ends_with('.') || name.ends_with('/') {
        return Err(invalid(name, "must not end with '.' or '/'"));
    }
    if name.ends_with(".lock") {
        return Err(invalid(name, "must not end with '.lock'"));
    }

    for component in rest.split('/') {
        if component.is_empty() {
            return Err(invalid(name, "path components must not be empty"));
        }
        if component.starts_with('.') {
            return Err(invalid(
                name,
                format!("component must not start with '.': {component:?}"),
            ));
        }
    }

    Ok(())
}
