//! The reset dispatcher.
//!
//! A reset runs in a fixed order:
//!
//! 1. resolve the target revision
//! 2. check the mode's preconditions (nothing has been written yet)
//! 3. unless the mode is soft, lock the index, rewrite it (and for hard,
//!    merge and keep, the working files) and commit it
//! 4. for whole-tree resets, move `HEAD` and clear in-progress merge state
//!
//! Errors from steps 1 and 2 are fatal and leave no trace. Later failures are
//! reported in [`ResetOutcome::failure`].

use std::sync::Arc;

use rewind_index::{Index, IndexLock, IndexStore, InMemoryIndexStore, Pathspec};
use rewind_merge::{one_way, two_way, update_worktree, MergeError};
use rewind_refs::{Expected, InMemoryRefStore, RefStore, BRANCH_STATE_REFS, HEAD, MERGE_HEAD};
use rewind_store::{Blob, EntryMode, InMemoryObjectStore, ObjectKind, ObjectStore};
use rewind_types::ObjectId;
use rewind_worktree::{InMemoryWorktree, Worktree};
use tracing::{debug, info, warn};

use crate::config::ResetOptions;
use crate::error::{ResetError, ResetResult};
use crate::mode::{IndexStrategy, ModeEffects, ResetMode};
use crate::outcome::{ResetFailure, ResetOutcome, UnstagedChange};
use crate::partial::{keep_as_intent_to_add, reset_paths};
use crate::resolve::{Resolver, Target};
use crate::transition::journal_message;

/// A repository: objects, pointers, the index and (optionally) working files.
pub struct Repository {
    objects: Arc<dyn ObjectStore>,
    refs: Arc<dyn RefStore>,
    index: Arc<dyn IndexStore>,
    worktree: Option<Arc<dyn Worktree>>,
    bare: bool,
}

impl Repository {
    /// A repository with a working tree.
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        refs: Arc<dyn RefStore>,
        index: Arc<dyn IndexStore>,
        worktree: Arc<dyn Worktree>,
    ) -> Self {
        Self {
            objects,
            refs,
            index,
            worktree: Some(worktree),
            bare: false,
        }
    }

    /// A non-bare repository whose working tree is not available.
    pub fn without_worktree(
        objects: Arc<dyn ObjectStore>,
        refs: Arc<dyn RefStore>,
        index: Arc<dyn IndexStore>,
    ) -> Self {
        Self {
            objects,
            refs,
            index,
            worktree: None,
            bare: false,
        }
    }

    /// A bare repository: no working tree, and mixed resets are refused.
    pub fn bare(
        objects: Arc<dyn ObjectStore>,
        refs: Arc<dyn RefStore>,
        index: Arc<dyn IndexStore>,
    ) -> Self {
        Self {
            objects,
            refs,
            index,
            worktree: None,
            bare: true,
        }
    }

    /// An empty in-memory repository with `HEAD` on an unborn `main`.
    pub fn in_memory() -> ResetResult<Self> {
        let refs = InMemoryRefStore::new();
        refs.set_symbolic_ref(HEAD, "refs/heads/main")?;
        Ok(Self::new(
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(refs),
            Arc::new(InMemoryIndexStore::new()),
            Arc::new(InMemoryWorktree::new()),
        ))
    }

    pub fn objects(&self) -> &dyn ObjectStore {
        self.objects.as_ref()
    }

    pub fn refs(&self) -> &dyn RefStore {
        self.refs.as_ref()
    }

    pub fn index_store(&self) -> &dyn IndexStore {
        self.index.as_ref()
    }

    pub fn worktree(&self) -> Option<&dyn Worktree> {
        self.worktree.as_deref()
    }

    pub fn is_bare(&self) -> bool {
        self.bare
    }

    /// Reset to `target` (`None` means `HEAD`).
    ///
    /// With a non-empty `pathspec` only matching index entries are reset
    /// from the target tree; `HEAD` and working files are not touched and
    /// the only accepted explicit mode is mixed. `mode` defaults to mixed.
    pub fn reset(
        &self,
        target: Option<&str>,
        mode: Option<ResetMode>,
        pathspec: &Pathspec,
        options: &ResetOptions,
    ) -> ResetResult<ResetOutcome> {
        let with_paths = !pathspec.is_empty();
        let target = Resolver::new(self.objects(), self.refs()).target(target, with_paths)?;

        let mut warnings = Vec::new();
        if with_paths {
            match mode {
                Some(ResetMode::Mixed) => {
                    warn!("mixed reset with paths is deprecated");
                    warnings.push(
                        "a mixed reset with paths is deprecated; reset paths without a mode instead"
                            .to_string(),
                    );
                }
                Some(other) => {
                    return Err(ResetError::Usage(format!("cannot do a {other} reset with paths")))
                }
                None => {}
            }
        }

        let mode = mode.unwrap_or_default();
        let effects = mode.effects();
        self.check_preconditions(mode, &effects, options)?;
        let keep_base = match effects.index {
            IndexStrategy::TwoWayThenOneWay => Some(self.head_tree()?),
            _ => None,
        };

        let head_before = self.refs.resolve(HEAD)?;
        let mut outcome = ResetOutcome::new(mode, &target.rev, target.tree, head_before);
        outcome.warnings = warnings;

        if effects.index != IndexStrategy::Untouched {
            let mut lock = IndexLock::acquire(self.index_store())?;
            if with_paths {
                reset_paths(
                    self.objects(),
                    lock.index_mut(),
                    &target.tree,
                    pathspec,
                    options.intent_to_add,
                )?;
            } else if let Some(failure) =
                self.rewrite_index(&mut lock, mode, &effects, &target, keep_base, options, &mut outcome)?
            {
                warn!(%mode, error = %failure, "reset aborted; index not written");
                outcome.failure = Some(failure);
                return Ok(outcome);
            }

            if mode == ResetMode::Mixed {
                if let Some(worktree) = self.worktree() {
                    outcome.unstaged = unstaged_changes(worktree, lock.index())?;
                    if !options.quiet && !outcome.unstaged.is_empty() {
                        outcome.messages.push("Unstaged changes after reset:".to_string());
                        outcome
                            .messages
                            .extend(outcome.unstaged.iter().map(ToString::to_string));
                    }
                }
            }

            lock.commit()?;
            outcome.index_committed = true;
        }

        if !with_paths {
            if let Some(commit) = target.commit {
                let transition = crate::transition::move_head(
                    self.refs(),
                    &target.rev,
                    commit,
                    options.reflog_action.as_deref(),
                )?;
                outcome.head_after = transition.new_head;
                match transition.failure {
                    Some(failure) => outcome.failure = Some(failure),
                    None if mode == ResetMode::Hard && !options.quiet => {
                        outcome.messages.push(self.head_line(&commit, options.abbrev)?);
                    }
                    None => {}
                }
            }
            self.clear_branch_state(options.reflog_action.as_deref());
        }

        info!(
            %mode,
            rev = %outcome.rev,
            tree = %outcome.tree.short_hex(),
            paths = pathspec.patterns().len(),
            status = outcome.status(),
            "reset finished"
        );
        Ok(outcome)
    }

    // ---- Preconditions ----

    fn check_preconditions(
        &self,
        mode: ResetMode,
        effects: &ModeEffects,
        options: &ResetOptions,
    ) -> ResetResult<()> {
        if effects.needs_worktree() && self.worktree.is_none() {
            return Err(ResetError::NoWorkTree { mode });
        }
        if mode == ResetMode::Mixed && self.bare {
            return Err(ResetError::BareRepository { mode });
        }
        if options.intent_to_add && mode != ResetMode::Mixed {
            return Err(ResetError::Usage(
                "intent-to-add can only be used with a mixed reset".to_string(),
            ));
        }
        if effects.rejects_unmerged
            && (self.refs.exists(MERGE_HEAD)? || self.index.read()?.has_unmerged())
        {
            return Err(ResetError::UnmergedState { mode });
        }
        Ok(())
    }

    /// Tree of the current `HEAD` commit, the base of a keep reset.
    fn head_tree(&self) -> ResetResult<ObjectId> {
        let head = self.refs.resolve(HEAD)?.ok_or(ResetError::NoValidHead)?;
        if self.objects.kind_of(&head)? != Some(ObjectKind::Commit) {
            return Err(ResetError::NoValidHead);
        }
        Ok(self.objects.read_commit(&head)?.tree)
    }

    // ---- Whole-tree index rewrite ----

    /// Rewrite the locked index (and working files) for a whole-tree reset.
    ///
    /// Every fallible index step runs before any file is touched. Returns a
    /// failure, with the lock's index left as it was, if the reset cannot
    /// proceed.
    #[allow(clippy::too_many_arguments)]
    fn rewrite_index(
        &self,
        lock: &mut IndexLock<'_>,
        mode: ResetMode,
        effects: &ModeEffects,
        target: &Target,
        keep_base: Option<ObjectId>,
        options: &ResetOptions,
        outcome: &mut ResetOutcome,
    ) -> ResetResult<Option<ResetFailure>> {
        let objects = self.objects();
        let before = lock.index().clone();

        let merged = match keep_base {
            Some(base) => match two_way(objects, &before, &base, &target.tree) {
                Ok(merged) => Some(merged),
                Err(MergeError::Conflict { paths }) => {
                    return Ok(Some(ResetFailure::StructuralConflict { paths }))
                }
                Err(e) => return Err(e.into()),
            },
            None => None,
        };

        let mut next = merged.clone().unwrap_or_else(|| before.clone());
        let removed = one_way(objects, &mut next, &target.tree, true)?;
        if effects.prime_cache_tree {
            next.prime_cache_tree(objects, &target.tree)?;
        }
        if mode == ResetMode::Mixed && options.intent_to_add {
            keep_as_intent_to_add(&mut next, &removed)?;
        }

        if let (Some(update), Some(worktree)) = (effects.worktree, self.worktree()) {
            let after = merged.as_ref().unwrap_or(&next);
            match update_worktree(objects, worktree, &before, after, update, options.submodules) {
                Ok(report) => {
                    if !report.skipped.is_empty() {
                        outcome.warnings.extend(
                            report
                                .skipped
                                .iter()
                                .map(|p| format!("{p}: local changes kept")),
                        );
                    }
                    outcome.checkout = report;
                }
                Err(e) => {
                    return Ok(Some(ResetFailure::WorktreeUpdate {
                        reason: e.to_string(),
                    }))
                }
            }
        }

        debug!(
            %mode,
            entries = next.len(),
            removed = removed.len(),
            "index rewritten"
        );
        lock.replace(next);
        Ok(None)
    }

    // ---- Reporting and cleanup ----

    fn head_line(&self, commit: &ObjectId, abbrev: usize) -> ResetResult<String> {
        let subject = self.objects.read_commit(commit)?.subject().to_string();
        let abbrev = commit.abbrev(abbrev);
        Ok(if subject.is_empty() {
            format!("HEAD is now at {abbrev}")
        } else {
            format!("HEAD is now at {abbrev} {subject}")
        })
    }

    /// Drop pointers of an abandoned merge, cherry-pick or revert.
    fn clear_branch_state(&self, label: Option<&str>) {
        let message = journal_message(label, "clearing branch state", None);
        for name in BRANCH_STATE_REFS {
            let observed = match self.refs.resolve(name) {
                Ok(Some(id)) => id,
                Ok(None) => continue,
                Err(e) => {
                    warn!(name, error = %e, "could not read branch state");
                    continue;
                }
            };
            match self.refs.delete_ref(name, Expected::Value(observed), Some(&message)) {
                Ok(_) => debug!(name, "branch state cleared"),
                Err(e) => warn!(name, error = %e, "could not clear branch state"),
            }
        }
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("bare", &self.bare)
            .field("worktree", &self.worktree.is_some())
            .finish()
    }
}

/// Working files that differ from the staged entries of `index`.
fn unstaged_changes(worktree: &dyn Worktree, index: &Index) -> ResetResult<Vec<UnstagedChange>> {
    let mut changes = Vec::new();
    for entry in index.entries() {
        if !entry.is_merged() || entry.mode == EntryMode::Gitlink {
            continue;
        }
        if entry.is_intent_to_add() {
            changes.push(UnstagedChange::Added(entry.path.clone()));
            continue;
        }
        match worktree.read_file(&entry.path)? {
            None => changes.push(UnstagedChange::Deleted(entry.path.clone())),
            Some(data) if Blob::id_for(&data) != entry.object_id => {
                changes.push(UnstagedChange::Modified(entry.path.clone()))
            }
            Some(_) => {}
        }
    }
    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    use proptest::prelude::*;
    use rewind_index::{FileIndexStore, IndexEntry, Stage};
    use rewind_refs::{RefError, RefJournal, RefValue, ORIG_HEAD};
    use rewind_store::{flatten_tree, Commit, Tree, TreeBuilder};
    use rewind_worktree::{DiskWorktree, WorktreeError, WorktreeResult};

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    }

    struct Fixture {
        objects: Arc<InMemoryObjectStore>,
        refs: Arc<dyn RefStore>,
        index: Arc<InMemoryIndexStore>,
        files: Arc<InMemoryWorktree>,
        repo: Repository,
    }

    impl Fixture {
        fn new() -> Self {
            let files = Arc::new(InMemoryWorktree::new());
            Self::build(
                Arc::new(InMemoryRefStore::new()),
                Some(files.clone() as Arc<dyn Worktree>),
                files,
            )
        }

        fn build(
            refs: Arc<dyn RefStore>,
            worktree: Option<Arc<dyn Worktree>>,
            files: Arc<InMemoryWorktree>,
        ) -> Self {
            init_tracing();
            refs.set_symbolic_ref(HEAD, "refs/heads/main").unwrap();
            let objects = Arc::new(InMemoryObjectStore::new());
            let index = Arc::new(InMemoryIndexStore::new());
            let repo = match worktree {
                Some(wt) => Repository::new(objects.clone(), refs.clone(), index.clone(), wt),
                None => Repository::without_worktree(objects.clone(), refs.clone(), index.clone()),
            };
            Self {
                objects,
                refs,
                index,
                files,
                repo,
            }
        }

        /// Commit `files` on top of `HEAD` and make index and worktree match.
        fn commit(&self, files: &[(&str, &str)], message: &str) -> ObjectId {
            let mut builder = TreeBuilder::new();
            let mut index = Index::new();
            for (path, content) in files {
                let id = self.objects.write_blob(content.as_bytes()).unwrap();
                builder.insert(path, EntryMode::Regular, id).unwrap();
                index
                    .add(IndexEntry::new(*path, id, EntryMode::Regular, content.len() as u64))
                    .unwrap();
            }
            let tree = builder.write(self.objects.as_ref()).unwrap();
            let parents = self.refs.resolve(HEAD).unwrap().into_iter().collect();
            let commit = self
                .objects
                .write_commit(&Commit::new(tree, parents, "dev", message))
                .unwrap();
            self.refs
                .update_ref(HEAD, commit, Expected::Any, "commit")
                .unwrap();

            self.set_index(index);
            for path in self.files.files().keys() {
                self.files.remove_file(path).unwrap();
            }
            for (path, content) in files {
                self.edit(path, content);
            }
            commit
        }

        fn set_index(&self, index: Index) {
            let mut lock = IndexLock::acquire(self.index.as_ref()).unwrap();
            lock.replace(index);
            lock.commit().unwrap();
        }

        fn stage(&self, path: &str, content: &str) {
            let id = self.objects.write_blob(content.as_bytes()).unwrap();
            let mut lock = IndexLock::acquire(self.index.as_ref()).unwrap();
            lock.index_mut()
                .add(IndexEntry::new(path, id, EntryMode::Regular, content.len() as u64))
                .unwrap();
            lock.commit().unwrap();
        }

        fn edit(&self, path: &str, content: &str) {
            self.files
                .write_file(path, content.as_bytes(), EntryMode::Regular)
                .unwrap();
        }

        fn reset(&self, rev: Option<&str>, mode: Option<ResetMode>) -> ResetResult<ResetOutcome> {
            self.repo
                .reset(rev, mode, &Pathspec::all(), &ResetOptions::default())
        }

        fn head(&self) -> Option<ObjectId> {
            self.refs.resolve(HEAD).unwrap()
        }

        fn orig_head(&self) -> Option<ObjectId> {
            self.refs.resolve(ORIG_HEAD).unwrap()
        }

        fn index(&self) -> Index {
            self.index.read().unwrap()
        }

        /// Merged index entries by path.
        fn staged(&self) -> BTreeMap<String, ObjectId> {
            self.index()
                .entries()
                .filter(|e| e.is_merged())
                .map(|e| (e.path.clone(), e.object_id))
                .collect()
        }

        fn tree_of(&self, commit: ObjectId) -> ObjectId {
            self.objects.read_commit(&commit).unwrap().tree
        }

        /// Flattened tree of `commit` by path.
        fn snapshot(&self, commit: ObjectId) -> BTreeMap<String, ObjectId> {
            flatten_tree(self.objects.as_ref(), &self.tree_of(commit))
                .unwrap()
                .into_iter()
                .map(|(p, e)| (p, e.object_id))
                .collect()
        }

        fn contents(&self) -> BTreeMap<String, String> {
            self.files
                .files()
                .into_iter()
                .map(|(p, d)| (p, String::from_utf8(d).unwrap()))
                .collect()
        }
    }

    fn blob(s: &str) -> ObjectId {
        Blob::id_for(s.as_bytes())
    }

    // ---- Mode behavior ----

    #[test]
    fn hard_reset_to_head_is_a_noop() {
        let f = Fixture::new();
        let a = f.commit(&[("src/lib.rs", "lib"), ("README", "hi")], "initial import\n\nbody");
        let index_before = f.index();
        let files_before = f.contents();

        let outcome = f.reset(None, Some(ResetMode::Hard)).unwrap();
        assert!(outcome.is_success());
        assert!(outcome.checkout.is_noop());
        let staged_before: BTreeMap<String, ObjectId> = index_before
            .entries()
            .map(|e| (e.path.clone(), e.object_id))
            .collect();
        assert_eq!(f.staged(), staged_before);
        assert_eq!(f.contents(), files_before);
        assert_eq!(f.head(), Some(a));
        assert_eq!(f.orig_head(), Some(a));
        assert_eq!(
            outcome.messages,
            vec![format!("HEAD is now at {} initial import", a.abbrev(7))]
        );
    }

    #[test]
    fn mixed_moves_index_and_leaves_files() {
        let f = Fixture::new();
        let a = f.commit(&[("a", "1"), ("dir/b", "1")], "A");
        let b = f.commit(&[("a", "2"), ("dir/b", "1"), ("dir/c", "new")], "B");
        let files_before = f.contents();

        let outcome = f.reset(Some("HEAD~1"), None).unwrap();
        assert_eq!(outcome.mode, ResetMode::Mixed);
        assert!(outcome.index_committed);
        assert_eq!(f.staged(), f.snapshot(a));
        assert_eq!(f.head(), Some(a));
        assert_eq!(f.orig_head(), Some(b));
        assert_eq!(f.contents(), files_before);
        assert_eq!(outcome.unstaged, vec![UnstagedChange::Modified("a".into())]);
        assert_eq!(outcome.messages, vec!["Unstaged changes after reset:", "M\ta"]);
    }

    #[test]
    fn quiet_suppresses_messages() {
        let f = Fixture::new();
        f.commit(&[("a", "1")], "A");
        f.commit(&[("a", "2")], "B");
        let options = ResetOptions {
            quiet: true,
            ..Default::default()
        };
        let outcome = f
            .repo
            .reset(Some("HEAD^"), Some(ResetMode::Hard), &Pathspec::all(), &options)
            .unwrap();
        assert!(outcome.messages.is_empty());
        assert_eq!(f.contents()["a"], "1");
    }

    #[test]
    fn soft_moves_only_pointers() {
        let f = Fixture::new();
        let a = f.commit(&[("a", "1")], "A");
        let b = f.commit(&[("a", "2")], "B");
        f.stage("staged", "s");
        f.edit("a", "local");
        let index_before = f.index();
        let files_before = f.contents();

        let outcome = f.reset(Some("HEAD~1"), Some(ResetMode::Soft)).unwrap();
        assert!(outcome.is_success());
        assert!(!outcome.index_committed);
        assert_eq!(f.index(), index_before);
        assert_eq!(f.contents(), files_before);
        assert_eq!(f.head(), Some(a));
        assert_eq!(f.orig_head(), Some(b));
    }

    #[test]
    fn hard_discards_local_changes_and_keeps_untracked_files() {
        let f = Fixture::new();
        let a = f.commit(&[("a", "1")], "A");
        f.commit(&[("a", "2"), ("added/c", "c")], "B");
        f.edit("a", "local");
        f.edit("untracked", "u");
        f.stage("staged", "s");
        f.edit("staged", "s");

        let outcome = f.reset(Some("HEAD~1"), Some(ResetMode::Hard)).unwrap();
        assert!(outcome.is_success());
        assert_eq!(f.staged(), f.snapshot(a));
        let files = f.contents();
        assert_eq!(files["a"], "1");
        assert!(!files.contains_key("added/c"));
        assert_eq!(files["untracked"], "u");
        assert!(!files.contains_key("staged"));
        assert_eq!(outcome.checkout.removed, vec!["added/c", "staged"]);
    }

    #[test]
    fn merge_keeps_dirty_files_and_updates_clean_ones() {
        let f = Fixture::new();
        let a = f.commit(&[("clean", "1"), ("dirty", "1")], "A");
        f.commit(&[("clean", "2"), ("dirty", "2")], "B");
        f.edit("dirty", "local");

        let outcome = f.reset(Some("HEAD~1"), Some(ResetMode::Merge)).unwrap();
        assert!(outcome.is_success());
        assert_eq!(f.staged(), f.snapshot(a));
        assert_eq!(f.contents()["clean"], "1");
        assert_eq!(f.contents()["dirty"], "local");
        assert_eq!(outcome.checkout.skipped, vec!["dirty"]);
        assert_eq!(outcome.warnings, vec!["dirty: local changes kept"]);
        assert_eq!(f.head(), Some(a));
    }

    #[test]
    fn merge_resolves_unmerged_paths() {
        let f = Fixture::new();
        let a = f.commit(&[("c", "1")], "A");
        f.refs.update_ref(MERGE_HEAD, a, Expected::Any, "merge").unwrap();
        let mut idx = f.index();
        idx.add(IndexEntry::conflict("c", blob("ours"), EntryMode::Regular, Stage::Ours))
            .unwrap();
        idx.add(IndexEntry::conflict("c", blob("theirs"), EntryMode::Regular, Stage::Theirs))
            .unwrap();
        f.set_index(idx);
        f.edit("c", "<<<<<<< conflict markers");

        let outcome = f.reset(None, Some(ResetMode::Merge)).unwrap();
        assert!(outcome.is_success());
        assert!(!f.index().has_unmerged());
        assert_eq!(f.contents()["c"], "1");
        assert!(!f.refs.exists(MERGE_HEAD).unwrap());
    }

    #[test]
    fn keep_carries_local_changes_across() {
        let f = Fixture::new();
        let a = f.commit(&[("local", "1"), ("moving", "1")], "A");
        let b = f.commit(&[("local", "1"), ("moving", "2")], "B");
        f.edit("local", "edited");

        let outcome = f.reset(Some("HEAD~1"), Some(ResetMode::Keep)).unwrap();
        assert!(outcome.is_success());
        assert_eq!(f.head(), Some(a));
        assert_eq!(f.orig_head(), Some(b));
        assert_eq!(f.staged(), f.snapshot(a));
        let files = f.contents();
        assert_eq!(files["moving"], "1");
        assert_eq!(files["local"], "edited");
        assert_eq!(f.index().cache_tree().root(), Some(f.tree_of(a)));
    }

    #[test]
    fn keep_conflict_changes_nothing() {
        let f = Fixture::new();
        f.commit(&[("a", "1"), ("z", "1"), ("m", "1")], "A");
        let b = f.commit(&[("a", "2"), ("z", "2"), ("m", "2")], "B");
        f.stage("z", "local");
        f.stage("a", "local");
        f.edit("a", "local");
        let index_before = f.index();
        let files_before = f.contents();

        let outcome = f.reset(Some("HEAD~1"), Some(ResetMode::Keep)).unwrap();
        assert_eq!(outcome.status(), 1);
        assert_eq!(
            outcome.failure,
            Some(ResetFailure::StructuralConflict {
                paths: vec!["a".into(), "z".into()]
            })
        );
        assert!(!outcome.index_committed);
        assert_eq!(f.index(), index_before);
        assert_eq!(f.contents(), files_before);
        assert_eq!(f.head(), Some(b));
        assert_eq!(f.orig_head(), None);
        assert!(!f.index.is_locked());
    }

    #[test]
    fn safe_modes_keep_dirty_file_where_directory_must_go() {
        for mode in [ResetMode::Merge, ResetMode::Keep] {
            let f = Fixture::new();
            let a = f.commit(&[("d/c", "c"), ("other", "1")], "A");
            f.commit(&[("d", "tracked"), ("other", "2")], "B");
            f.edit("d", "precious local edit");

            let outcome = f.reset(Some("HEAD~1"), Some(mode)).unwrap();
            assert!(outcome.is_success(), "{mode}: {:?}", outcome.failure);
            assert_eq!(f.head(), Some(a));
            assert_eq!(f.staged(), f.snapshot(a));
            assert_eq!(outcome.checkout.skipped, vec!["d", "d/c"]);
            assert_eq!(
                outcome.warnings,
                vec!["d: local changes kept", "d/c: local changes kept"]
            );
            let files = f.contents();
            assert_eq!(files["d"], "precious local edit", "{mode}");
            assert_eq!(files["other"], "1");
            assert!(!files.contains_key("d/c"));
        }
    }

    #[test]
    fn mixed_on_unborn_head_unstages_everything() {
        let f = Fixture::new();
        f.stage("a", "1");
        f.stage("dir/b", "2");
        f.edit("a", "1");
        let files_before = f.contents();

        let outcome = f.reset(None, None).unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.tree, Tree::empty_id());
        assert!(f.index().is_empty());
        assert_eq!(f.contents(), files_before);
        assert_eq!(f.head(), None);
        assert_eq!(f.orig_head(), None);
        assert_eq!(outcome.head_after, None);
    }

    #[test]
    fn cache_tree_matches_target_after_mixed_and_hard() {
        for mode in [ResetMode::Mixed, ResetMode::Hard] {
            let f = Fixture::new();
            let a = f.commit(&[("src/a.rs", "a"), ("src/deep/b.rs", "b"), ("top", "t")], "A");
            f.commit(&[("src/a.rs", "a2"), ("other/c", "c")], "B");

            f.reset(Some("HEAD~1"), Some(mode)).unwrap();
            let mut index = f.index();
            assert_eq!(index.cache_tree().root(), Some(f.tree_of(a)), "{mode}");

            let mut scratch = Index::new();
            for entry in index.entries() {
                scratch.add(entry.clone()).unwrap();
            }
            assert!(scratch.cache_tree().is_empty());
            assert_eq!(scratch.write_tree(f.objects.as_ref()).unwrap(), f.tree_of(a));
            assert_eq!(index.write_tree(f.objects.as_ref()).unwrap(), f.tree_of(a));
        }
    }

    #[test]
    fn full_mixed_with_intent_to_add_keeps_placeholders() {
        let f = Fixture::new();
        let a = f.commit(&[("a", "1")], "A");
        f.commit(&[("a", "1"), ("new", "n")], "B");
        let options = ResetOptions {
            intent_to_add: true,
            ..Default::default()
        };

        let outcome = f
            .repo
            .reset(Some("HEAD~1"), None, &Pathspec::all(), &options)
            .unwrap();
        let index = f.index();
        assert!(index.get("new").unwrap().is_intent_to_add());
        assert_eq!(index.get("a").unwrap().object_id, f.snapshot(a)["a"]);
        assert_eq!(outcome.unstaged, vec![UnstagedChange::Added("new".into())]);
    }

    #[test]
    fn full_reset_clears_branch_state() {
        let f = Fixture::new();
        let a = f.commit(&[("a", "1")], "A");
        for name in BRANCH_STATE_REFS {
            f.refs.update_ref(name, a, Expected::Any, "in progress").unwrap();
        }
        f.reset(None, Some(ResetMode::Hard)).unwrap();
        for name in BRANCH_STATE_REFS {
            assert!(!f.refs.exists(name).unwrap(), "{name}");
            let log = f.refs.journal().entries(name).unwrap();
            let last = log.last().unwrap();
            assert_eq!(last.message, "reset: clearing branch state");
            assert_eq!((last.old, last.new), (Some(a), None));
        }
    }

    #[test]
    fn reflog_label_and_rev_in_journal() {
        let f = Fixture::new();
        f.commit(&[("a", "1")], "A");
        f.commit(&[("a", "2")], "B");

        f.reset(Some("main~1"), Some(ResetMode::Soft)).unwrap();
        let log = f.refs.journal().entries(HEAD).unwrap();
        assert_eq!(log.last().unwrap().message, "reset: moving to main~1");

        let options = ResetOptions {
            reflog_action: Some("rebase".into()),
            ..Default::default()
        };
        f.repo
            .reset(Some("ORIG_HEAD"), Some(ResetMode::Soft), &Pathspec::all(), &options)
            .unwrap();
        let log = f.refs.journal().entries(HEAD).unwrap();
        assert_eq!(log.last().unwrap().message, "rebase: updating HEAD");
    }

    // ---- Path-restricted resets ----

    #[test]
    fn path_reset_never_moves_head() {
        let f = Fixture::new();
        let a = f.commit(&[("a", "1"), ("b", "1")], "A");
        f.stage("a", "2");
        f.stage("b", "2");
        let journal_len = f.refs.journal().entries(HEAD).unwrap().len();

        let outcome = f
            .repo
            .reset(None, None, &Pathspec::new(["a"]), &ResetOptions::default())
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(f.index().get("a").unwrap().object_id, blob("1"));
        assert_eq!(f.index().get("b").unwrap().object_id, blob("2"));
        assert_eq!(f.head(), Some(a));
        assert_eq!(f.orig_head(), None);
        assert_eq!(f.refs.journal().entries(HEAD).unwrap().len(), journal_len);
    }

    #[test]
    fn path_reset_accepts_a_tree_and_keeps_branch_state() {
        let f = Fixture::new();
        let a = f.commit(&[("a", "1")], "A");
        f.refs.update_ref(MERGE_HEAD, a, Expected::Any, "merge").unwrap();
        f.stage("a", "2");

        let tree = f.tree_of(a).to_hex();
        f.repo
            .reset(Some(&tree), None, &Pathspec::new(["a"]), &ResetOptions::default())
            .unwrap();
        assert_eq!(f.index().get("a").unwrap().object_id, blob("1"));
        assert!(f.refs.exists(MERGE_HEAD).unwrap());
    }

    #[test]
    fn mixed_with_paths_warns() {
        let f = Fixture::new();
        f.commit(&[("a", "1")], "A");
        let outcome = f
            .repo
            .reset(None, Some(ResetMode::Mixed), &Pathspec::new(["a"]), &ResetOptions::default())
            .unwrap();
        assert_eq!(outcome.warnings.len(), 1);
    }

    const PATHS: [&str; 4] = ["a", "b", "d/c", "d/e"];

    fn files_from(sides: &[Option<u8>]) -> Vec<(&'static str, String)> {
        PATHS
            .iter()
            .zip(sides)
            .filter_map(|(p, s)| s.map(|v| (*p, v.to_string())))
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn path_reset_only_changes_matched_entries(
            head in proptest::collection::vec(proptest::option::of(0u8..3), PATHS.len()),
            staged in proptest::collection::vec(proptest::option::of(0u8..3), PATHS.len()),
            selected in proptest::collection::vec(any::<bool>(), PATHS.len()),
        ) {
            prop_assume!(selected.iter().any(|s| *s));
            let f = Fixture::new();
            let head_files = files_from(&head);
            let borrowed: Vec<(&str, &str)> = head_files.iter().map(|(p, c)| (*p, c.as_str())).collect();
            let commit = f.commit(&borrowed, "head");

            let mut index = Index::new();
            for (path, content) in files_from(&staged) {
                let id = f.objects.write_blob(content.as_bytes()).unwrap();
                index.add(IndexEntry::new(path, id, EntryMode::Regular, 0)).unwrap();
            }
            f.set_index(index.clone());

            let pathspec = Pathspec::new(PATHS.iter().zip(&selected).filter(|(_, s)| **s).map(|(p, _)| *p));
            let outcome = f.repo.reset(None, None, &pathspec, &ResetOptions::default()).unwrap();
            prop_assert!(outcome.is_success());
            prop_assert_eq!(f.head(), Some(commit));
            prop_assert_eq!(f.orig_head(), None);

            let tree = f.snapshot(commit);
            let after = f.staged();
            for (k, path) in PATHS.iter().enumerate() {
                let got = after.get(*path).copied();
                let want = if selected[k] {
                    tree.get(*path).copied()
                } else {
                    index.get(path).map(|e| e.object_id)
                };
                prop_assert_eq!(got, want, "{}", path);
            }
        }
    }

    // ---- Preconditions ----

    #[test]
    fn non_mixed_mode_with_paths_is_a_usage_error() {
        let f = Fixture::new();
        f.commit(&[("a", "1")], "A");
        for mode in [ResetMode::Soft, ResetMode::Hard, ResetMode::Merge, ResetMode::Keep] {
            let err = f
                .repo
                .reset(None, Some(mode), &Pathspec::new(["a"]), &ResetOptions::default())
                .unwrap_err();
            assert!(matches!(err, ResetError::Usage(_)), "{mode}: {err}");
        }
    }

    #[test]
    fn worktree_modes_need_a_worktree() {
        let f = Fixture::build(
            Arc::new(InMemoryRefStore::new()),
            None,
            Arc::new(InMemoryWorktree::new()),
        );
        f.commit(&[("a", "1")], "A");
        for mode in [ResetMode::Hard, ResetMode::Merge, ResetMode::Keep] {
            assert!(matches!(
                f.reset(None, Some(mode)),
                Err(ResetError::NoWorkTree { .. })
            ));
        }
        // Mixed still works; there is just nothing to report on.
        let outcome = f.reset(None, None).unwrap();
        assert!(outcome.unstaged.is_empty());
    }

    #[test]
    fn bare_repository_refuses_mixed() {
        let refs = InMemoryRefStore::new();
        refs.set_symbolic_ref(HEAD, "refs/heads/main").unwrap();
        let repo = Repository::bare(
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(refs),
            Arc::new(InMemoryIndexStore::new()),
        );
        assert!(repo.is_bare());
        assert!(matches!(
            repo.reset(None, None, &Pathspec::all(), &ResetOptions::default()),
            Err(ResetError::BareRepository { mode: ResetMode::Mixed })
        ));
        assert!(repo
            .reset(None, Some(ResetMode::Soft), &Pathspec::all(), &ResetOptions::default())
            .is_ok());
    }

    #[test]
    fn intent_to_add_is_mixed_only() {
        let f = Fixture::new();
        f.commit(&[("a", "1")], "A");
        let options = ResetOptions {
            intent_to_add: true,
            ..Default::default()
        };
        assert!(matches!(
            f.repo.reset(None, Some(ResetMode::Hard), &Pathspec::all(), &options),
            Err(ResetError::Usage(_))
        ));
    }

    #[test]
    fn soft_and_keep_refuse_unmerged_state() {
        let f = Fixture::new();
        let a = f.commit(&[("a", "1")], "A");

        f.refs.update_ref(MERGE_HEAD, a, Expected::Any, "merge").unwrap();
        for mode in [ResetMode::Soft, ResetMode::Keep] {
            assert!(matches!(
                f.reset(None, Some(mode)),
                Err(ResetError::UnmergedState { .. })
            ));
        }
        f.refs.delete_ref(MERGE_HEAD, Expected::Any, None).unwrap();

        let mut idx = f.index();
        idx.add(IndexEntry::conflict("x", blob("o"), EntryMode::Regular, Stage::Ours))
            .unwrap();
        f.set_index(idx);
        let journal_len = f.refs.journal().entries(HEAD).unwrap().len();
        assert!(matches!(
            f.reset(None, Some(ResetMode::Soft)),
            Err(ResetError::UnmergedState { mode: ResetMode::Soft })
        ));
        assert_eq!(f.refs.journal().entries(HEAD).unwrap().len(), journal_len);
        assert_eq!(f.orig_head(), None);
    }

    #[test]
    fn keep_needs_a_valid_head() {
        let f = Fixture::new();
        assert!(matches!(
            f.reset(None, Some(ResetMode::Keep)),
            Err(ResetError::NoValidHead)
        ));
    }

    #[test]
    fn locked_index_is_fatal() {
        let f = Fixture::new();
        f.commit(&[("a", "1")], "A");
        f.commit(&[("a", "2")], "B");
        let head = f.head();
        f.index.acquire().unwrap();

        assert!(matches!(
            f.reset(Some("HEAD~1"), Some(ResetMode::Hard)),
            Err(ResetError::IndexLocked(_))
        ));
        assert_eq!(f.head(), head);
        assert_eq!(f.contents()["a"], "2");
        f.index.release();
    }

    #[test]
    fn unresolvable_revision_is_fatal() {
        let f = Fixture::new();
        let a = f.commit(&[("a", "1")], "A");
        assert!(matches!(
            f.reset(Some("does-not-exist"), Some(ResetMode::Hard)),
            Err(ResetError::UnresolvableRevision { .. })
        ));
        assert!(matches!(
            f.reset(Some("HEAD~5"), None),
            Err(ResetError::UnresolvableRevision { .. })
        ));
        // A tree is fine for paths but not for a whole-tree reset.
        let tree = f.tree_of(a).to_hex();
        assert!(matches!(
            f.reset(Some(&tree), None),
            Err(ResetError::UnresolvableRevision { .. })
        ));
        assert_eq!(f.head(), Some(a));
    }

    // ---- Concurrency and partial failure ----

    /// Moves `HEAD` to `intruder` just before the reset's own `HEAD` write.
    struct RacingRefs {
        inner: InMemoryRefStore,
        intruder: std::sync::Mutex<ObjectId>,
        armed: AtomicBool,
    }

    impl RefStore for RacingRefs {
        fn read_ref(&self, name: &str) -> rewind_refs::Result<Option<RefValue>> {
            self.inner.read_ref(name)
        }

        fn update_ref(
            &self,
            name: &str,
            new: ObjectId,
            expected: Expected,
            message: &str,
        ) -> rewind_refs::Result<()> {
            if name == HEAD && self.armed.swap(false, Ordering::SeqCst) {
                let intruder = *self.intruder.lock().unwrap();
                self.inner
                    .update_ref(HEAD, intruder, Expected::Any, "concurrent writer")?;
            }
            self.inner.update_ref(name, new, expected, message)
        }

        fn delete_ref(
            &self,
            name: &str,
            expected: Expected,
            message: Option<&str>,
        ) -> rewind_refs::Result<bool> {
            self.inner.delete_ref(name, expected, message)
        }

        fn set_symbolic_ref(&self, name: &str, target: &str) -> rewind_refs::Result<()> {
            self.inner.set_symbolic_ref(name, target)
        }

        fn list_refs(&self, prefix: &str) -> rewind_refs::Result<Vec<(String, RefValue)>> {
            self.inner.list_refs(prefix)
        }

        fn journal(&self) -> &dyn RefJournal {
            self.inner.journal()
        }
    }

    #[test]
    fn lost_head_race_keeps_index_and_reports_failure() {
        let racing = Arc::new(RacingRefs {
            inner: InMemoryRefStore::new(),
            intruder: std::sync::Mutex::new(ObjectId::from_bytes(b"unset")),
            armed: AtomicBool::new(false),
        });
        let files = Arc::new(InMemoryWorktree::new());
        let f = Fixture::build(racing.clone(), Some(files.clone() as Arc<dyn Worktree>), files);
        let a = f.commit(&[("a", "1")], "A");
        let b = f.commit(&[("a", "2")], "B");

        let mut builder = TreeBuilder::new();
        builder
            .insert("a", EntryMode::Regular, f.objects.write_blob(b"3").unwrap())
            .unwrap();
        let other_tree = builder.write(f.objects.as_ref()).unwrap();
        let intruder = f
            .objects
            .write_commit(&Commit::new(other_tree, vec![b], "someone else", "C"))
            .unwrap();
        *racing.intruder.lock().unwrap() = intruder;
        racing.armed.store(true, Ordering::SeqCst);

        let outcome = f.reset(Some("HEAD~1"), None).unwrap();
        assert_eq!(outcome.status(), 1);
        assert_eq!(
            outcome.failure,
            Some(ResetFailure::ConcurrentPointerMutation {
                name: HEAD.to_string(),
                expected: Expected::Value(b),
                actual: Some(intruder),
            })
        );
        assert_eq!(f.head(), Some(intruder));
        assert_eq!(outcome.head_after, Some(intruder));
        assert!(outcome.index_committed);
        assert_eq!(f.staged(), f.snapshot(a));
        assert_eq!(f.orig_head(), Some(b));

        // The committed index still names the target tree, which no longer
        // matches the tree of whatever HEAD now points at.
        let cache_root = f.index().cache_tree().root();
        assert_eq!(cache_root, Some(f.tree_of(a)));
        assert_ne!(cache_root, Some(f.tree_of(intruder)));
    }

    /// Reads and removes normally; every write fails.
    struct FailingWorktree {
        inner: Arc<InMemoryWorktree>,
    }

    impl Worktree for FailingWorktree {
        fn read_file(&self, path: &str) -> WorktreeResult<Option<Vec<u8>>> {
            self.inner.read_file(path)
        }

        fn write_file(&self, path: &str, _data: &[u8], _mode: EntryMode) -> WorktreeResult<()> {
            Err(WorktreeError::Io {
                path: path.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            })
        }

        fn remove_file(&self, path: &str) -> WorktreeResult<bool> {
            self.inner.remove_file(path)
        }
    }

    #[test]
    fn worktree_failure_leaves_index_and_head() {
        let files = Arc::new(InMemoryWorktree::new());
        let failing = Arc::new(FailingWorktree {
            inner: files.clone(),
        });
        let f = Fixture::build(Arc::new(InMemoryRefStore::new()), Some(failing as Arc<dyn Worktree>), files);
        // Seed through the inner worktree since writes through the repo fail.
        f.commit(&[("a", "1")], "A");
        let b = f.commit(&[("a", "2")], "B");
        let index_before = f.index();

        let outcome = f.reset(Some("HEAD~1"), Some(ResetMode::Hard)).unwrap();
        assert!(matches!(
            outcome.failure,
            Some(ResetFailure::WorktreeUpdate { ref reason }) if reason.contains("disk full")
        ));
        assert!(!outcome.index_committed);
        assert_eq!(f.index(), index_before);
        assert_eq!(f.head(), Some(b));
        assert_eq!(f.orig_head(), None);
        assert!(!f.index.is_locked());
    }

    #[test]
    fn ref_errors_surface_as_storage() {
        let err: ResetError = RefError::SymbolicLoop { name: "HEAD".into() }.into();
        assert!(matches!(err, ResetError::Storage(_)));
    }

    // ---- On-disk stores ----

    #[test]
    fn hard_reset_on_disk() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir(&work).unwrap();

        let objects = Arc::new(InMemoryObjectStore::new());
        let refs = Arc::new(InMemoryRefStore::new());
        refs.set_symbolic_ref(HEAD, "refs/heads/main").unwrap();
        let index = Arc::new(FileIndexStore::open(&dir.path().join("meta")).unwrap());
        let worktree = Arc::new(DiskWorktree::open(&work).unwrap());
        let repo = Repository::new(objects.clone(), refs.clone(), index.clone(), worktree.clone());

        let mut commits = Vec::new();
        for files in [&[("src/main.rs", "v1")][..], &[("src/main.rs", "v2"), ("docs/x.md", "x")][..]] {
            let mut builder = TreeBuilder::new();
            for (path, content) in files {
                let id = objects.write_blob(content.as_bytes()).unwrap();
                builder.insert(path, EntryMode::Regular, id).unwrap();
            }
            let tree = builder.write(objects.as_ref()).unwrap();
            let parents = refs.resolve(HEAD).unwrap().into_iter().collect();
            let commit = objects
                .write_commit(&Commit::new(tree, parents, "dev", "snapshot"))
                .unwrap();
            refs.update_ref(HEAD, commit, Expected::Any, "commit").unwrap();
            commits.push(commit);
        }

        // Populate the disk from the second commit, then step back.
        repo.reset(None, Some(ResetMode::Hard), &Pathspec::all(), &ResetOptions::default())
            .unwrap();
        assert_eq!(std::fs::read_to_string(work.join("docs/x.md")).unwrap(), "x");

        let outcome = repo
            .reset(Some("HEAD~1"), Some(ResetMode::Hard), &Pathspec::all(), &ResetOptions::default())
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(std::fs::read_to_string(work.join("src/main.rs")).unwrap(), "v1");
        assert!(!work.join("docs").exists());
        assert!(!index.lock_path().exists());

        let reopened = FileIndexStore::open(&dir.path().join("meta")).unwrap();
        let staged = reopened.read().unwrap();
        assert_eq!(staged.len(), 1);
        assert_eq!(
            staged.cache_tree().root(),
            Some(objects.read_commit(&commits[0]).unwrap().tree)
        );
    }

    #[test]
    fn merge_on_disk_keeps_dirty_file_where_directory_must_go() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir(&work).unwrap();

        let objects = Arc::new(InMemoryObjectStore::new());
        let refs = Arc::new(InMemoryRefStore::new());
        refs.set_symbolic_ref(HEAD, "refs/heads/main").unwrap();
        let index = Arc::new(FileIndexStore::open(&dir.path().join("meta")).unwrap());
        let worktree = Arc::new(DiskWorktree::open(&work).unwrap());
        let repo = Repository::new(objects.clone(), refs.clone(), index, worktree);

        let mut commits = Vec::new();
        for files in [&[("d/c", "c"), ("other", "1")][..], &[("d", "tracked"), ("other", "2")][..]] {
            let mut builder = TreeBuilder::new();
            for (path, content) in files {
                let id = objects.write_blob(content.as_bytes()).unwrap();
                builder.insert(path, EntryMode::Regular, id).unwrap();
            }
            let tree = builder.write(objects.as_ref()).unwrap();
            let parents = refs.resolve(HEAD).unwrap().into_iter().collect();
            let commit = objects
                .write_commit(&Commit::new(tree, parents, "dev", "snapshot"))
                .unwrap();
            refs.update_ref(HEAD, commit, Expected::Any, "commit").unwrap();
            commits.push(commit);
        }
        repo.reset(None, Some(ResetMode::Hard), &Pathspec::all(), &ResetOptions::default())
            .unwrap();
        std::fs::write(work.join("d"), "precious local edit").unwrap();

        let outcome = repo
            .reset(Some("HEAD~1"), Some(ResetMode::Merge), &Pathspec::all(), &ResetOptions::default())
            .unwrap();
        assert!(outcome.is_success(), "{:?}", outcome.failure);
        assert_eq!(outcome.checkout.skipped, vec!["d", "d/c"]);
        assert_eq!(std::fs::read_to_string(work.join("d")).unwrap(), "precious local edit");
        assert_eq!(std::fs::read_to_string(work.join("other")).unwrap(), "1");
        assert_eq!(refs.resolve(HEAD).unwrap(), Some(commits[0]));
    }
}
