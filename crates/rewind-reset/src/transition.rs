//! Moving `HEAD` while keeping `ORIG_HEAD` as the undo pointer.

use rewind_refs::{Expected, RefError, RefStore, HEAD, ORIG_HEAD};
use rewind_types::ObjectId;
use tracing::{debug, warn};

use crate::error::ResetResult;
use crate::outcome::ResetFailure;

/// Result of a [`move_head`] call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    /// Dereferenced `HEAD` before the move.
    pub old_head: Option<ObjectId>,
    /// `HEAD` after the move; equals `old_head` if the move failed.
    pub new_head: Option<ObjectId>,
    /// Set if `HEAD` moved underneath us.
    pub failure: Option<ResetFailure>,
}

impl Transition {
    pub fn moved(&self) -> bool {
        self.failure.is_none()
    }
}

pub(crate) fn journal_message(label: Option<&str>, action: &str, rev: Option<&str>) -> String {
    match (label, rev) {
        (Some(label), _) => format!("{label}: {action}"),
        (None, Some(rev)) => format!("reset: moving to {rev}"),
        (None, None) => format!("reset: {action}"),
    }
}

/// Point `HEAD` at `target`, saving the old value in `ORIG_HEAD`.
///
/// `ORIG_HEAD` is advisory: failing to update it is logged and ignored. A
/// `HEAD` that changed since it was read is reported in
/// [`Transition::failure`] and left as it is.
pub fn move_head(
    refs: &dyn RefStore,
    rev: &str,
    target: ObjectId,
    label: Option<&str>,
) -> ResetResult<Transition> {
    let old_head = refs.resolve(HEAD)?;
    let old_orig = refs.resolve(ORIG_HEAD)?;

    match old_head {
        Some(head) => {
            let message = journal_message(label, "updating ORIG_HEAD", None);
            if let Err(e) = refs.update_ref(ORIG_HEAD, head, Expected::observed(old_orig), &message) {
                warn!(error = %e, "could not update ORIG_HEAD");
            }
        }
        None => {
            if let Some(orig) = old_orig {
                let message = journal_message(label, "deleting ORIG_HEAD", None);
                if let Err(e) = refs.delete_ref(ORIG_HEAD, Expected::Value(orig), Some(&message)) {
                    warn!(error = %e, "could not delete stale ORIG_HEAD");
                }
            }
        }
    }

    let message = journal_message(label, "updating HEAD", Some(rev));
    match refs.update_ref(HEAD, target, Expected::observed(old_head), &message) {
        Ok(()) => {
            debug!(
                from = ?old_head.map(|h| h.short_hex()),
                to = %target.short_hex(),
                "HEAD moved"
            );
            Ok(Transition {
                old_head,
                new_head: Some(target),
                failure: None,
            })
        }
        Err(RefError::CasMismatch {
            name,
            expected,
            actual,
        }) => {
            warn!(%name, %expected, "HEAD moved concurrently; not updated");
            Ok(Transition {
                old_head,
                new_head: actual,
                failure: Some(ResetFailure::ConcurrentPointerMutation {
                    name,
                    expected,
                    actual,
                }),
            })
        }
        Err(e) => Err(e.into()),
    }
}
