//! Bringing working files in line with a rewritten index.
//!
//! The update is computed from the index before and after a merge pass.
//! Removals run before writes so a file can replace a directory (and the
//! other way round) in one update.

use std::collections::BTreeSet;

use rewind_index::{Index, IndexEntry};
use rewind_store::{EntryMode, ObjectStore};
use rewind_types::ObjectId;
use rewind_worktree::Worktree;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::MergeResult;

/// How working files are updated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateMode {
    /// Overwrite every file that differs from the new index and remove every
    /// file no longer tracked. Local content is discarded.
    Forced,
    /// Only touch paths whose index entry changed, and only when the file
    /// still holds what the old index staged. Other files are skipped.
    Safe,
}

/// Whether submodule (gitlink) entries are checked out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmodulePolicy {
    /// Leave submodules alone.
    #[default]
    Skip,
    /// Check out the recorded commit in each changed submodule.
    Recurse,
}

/// What a worktree update did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckoutReport {
    /// Files written, in path order.
    pub written: Vec<String>,
    /// Files removed, in path order.
    pub removed: Vec<String>,
    /// Paths left alone because they held local changes (safe mode only).
    pub skipped: Vec<String>,
    /// Submodules checked out.
    pub submodules: Vec<String>,
}

impl CheckoutReport {
    /// Returns `true` if no file was touched.
    pub fn is_noop(&self) -> bool {
        self.written.is_empty() && self.removed.is_empty() && self.submodules.is_empty()
    }
}

/// A clean merged entry, or `None` for absent, placeholder or unmerged state.
fn clean(index: &Index, path: &str) -> Option<IndexEntry> {
    index
        .get(path)
        .filter(|e| !e.is_intent_to_add())
        .cloned()
}

fn same(a: &Option<IndexEntry>, b: &Option<IndexEntry>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.mode == b.mode && a.object_id == b.object_id,
        (None, None) => true,
        _ => false,
    }
}

enum Action {
    Remove(String),
    Write(String, ObjectId, EntryMode),
    Submodule(String, ObjectId),
}

/// Update the working files from `before` to `after`.
pub fn update_worktree(
    store: &dyn ObjectStore,
    worktree: &dyn Worktree,
    before: &Index,
    after: &Index,
    mode: UpdateMode,
    submodules: SubmodulePolicy,
) -> MergeResult<CheckoutReport> {
    let mut report = CheckoutReport::default();
    let mut removals = Vec::new();
    let mut writes = Vec::new();

    let paths: BTreeSet<String> = before.paths().into_iter().chain(after.paths()).collect();
    for path in paths {
        let old = clean(before, &path);
        let new = clean(after, &path);
        let unmerged = before.stages_of(&path).iter().any(|e| !e.is_merged());
        let changed = unmerged || !same(&old, &new);

        // Placeholders keep whatever file the user has.
        if after.contains_path(&path) && new.is_none() {
            continue;
        }

        let is_gitlink = |e: &Option<IndexEntry>| e.as_ref().is_some_and(|e| e.mode == EntryMode::Gitlink);
        if is_gitlink(&new) || (new.is_none() && is_gitlink(&old)) {
            if let (Some(entry), SubmodulePolicy::Recurse) = (&new, submodules) {
                if changed || mode == UpdateMode::Forced {
                    writes.push(Action::Submodule(path, entry.object_id));
                }
            }
            continue;
        }

        match mode {
            UpdateMode::Forced => match &new {
                Some(entry) => {
                    let mode_changed = old.as_ref().is_some_and(|o| o.mode != entry.mode);
                    if mode_changed || !worktree.matches(&path, &entry.object_id)? {
                        writes.push(Action::Write(path, entry.object_id, entry.mode));
                    }
                }
                None => removals.push(Action::Remove(path)),
            },
            UpdateMode::Safe => {
                if !changed {
                    continue;
                }
                if !up_to_date(worktree, &path, before, old.as_ref(), new.as_ref())? {
                    warn!(path = %path, "local changes in working file; not updated");
                    report.skipped.push(path);
                    continue;
                }
                match &new {
                    Some(entry) => writes.push(Action::Write(path, entry.object_id, entry.mode)),
                    None => removals.push(Action::Remove(path)),
                }
            }
        }
    }

    if mode == UpdateMode::Safe {
        writes = hold_back_blocked(worktree, before, writes, &mut report.skipped)?;
    }

    for action in removals.into_iter().chain(writes) {
        match action {
            Action::Remove(path) => {
                if worktree.remove_file(&path)? {
                    report.removed.push(path);
                }
            }
            Action::Write(path, id, mode) => {
                // Only a forced update can still find a file where a
                // directory must go; safe writes were held back above.
                for ancestor in ancestors(&path) {
                    if worktree.remove_file(ancestor)? {
                        report.removed.push(ancestor.to_string());
                    }
                }
                let data = store.read_blob(&id)?;
                worktree.write_file(&path, &data, mode)?;
                report.written.push(path);
            }
            Action::Submodule(path, commit) => {
                worktree.checkout_submodule(&path, &commit)?;
                report.submodules.push(path);
            }
        }
    }

    report.removed.sort();

    debug!(
        written = report.written.len(),
        removed = report.removed.len(),
        skipped = report.skipped.len(),
        ?mode,
        "worktree updated"
    );
    Ok(report)
}

/// Proper ancestors of `path`, outermost first.
fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('/').map(move |(i, _)| &path[..i])
}

/// Drop safe-mode writes that would displace a file the update must keep.
///
/// A write is blocked when an ancestor was skipped or holds an untracked
/// file, or when a skipped file lies below it. Blocked paths join `skipped`.
fn hold_back_blocked(
    worktree: &dyn Worktree,
    before: &Index,
    writes: Vec<Action>,
    skipped: &mut Vec<String>,
) -> MergeResult<Vec<Action>> {
    let mut kept_files: BTreeSet<String> = skipped.iter().cloned().collect();
    let mut allowed = Vec::with_capacity(writes.len());
    for action in writes {
        let Action::Write(path, ..) = &action else {
            allowed.push(action);
            continue;
        };
        let mut blocked = false;
        for ancestor in ancestors(path) {
            if kept_files.contains(ancestor)
                || (!before.contains_path(ancestor) && worktree.read_file(ancestor)?.is_some())
            {
                blocked = true;
                break;
            }
        }
        let below = format!("{path}/");
        blocked |= kept_files
            .range(below.clone()..)
            .next()
            .is_some_and(|p| p.starts_with(&below));
        if blocked {
            warn!(path = %path, "kept file in the way; not updated");
            kept_files.insert(path.clone());
            skipped.push(path.clone());
        } else {
            allowed.push(action);
        }
    }
    skipped.sort();
    Ok(allowed)
}

/// Safe-mode check: may the file at `path` be replaced?
///
/// Yes if it holds what the old index staged (or is absent where the old
/// index had nothing), or already holds the new content. Unmerged paths carry
/// conflict output and may always be replaced.
fn up_to_date(
    worktree: &dyn Worktree,
    path: &str,
    before: &Index,
    old: Option<&IndexEntry>,
    new: Option<&IndexEntry>,
) -> MergeResult<bool> {
    if before.stages_of(path).iter().any(|e| !e.is_merged()) {
        return Ok(true);
    }
    let current = worktree.read_file(path)?;
    let holds = |entry: Option<&IndexEntry>| match (entry, &current) {
        (Some(e), Some(data)) => rewind_store::Blob::id_for(data) == e.object_id,
        (None, None) => true,
        _ => false,
    };
    Ok(holds(old) || holds(new))
}
