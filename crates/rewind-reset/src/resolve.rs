//! Revision resolution.
//!
//! A revision is a base name followed by navigation suffixes:
//!
//! - base: a full hex object id, `@` (alias for `HEAD`), an all-caps pointer
//!   such as `ORIG_HEAD`, a full `refs/...` name, or a short name tried as
//!   `refs/<name>`, `refs/tags/<name>`, `refs/heads/<name>` in that order
//! - `^N`: the N-th parent (`^` is `^1`, `^0` is the commit itself)
//! - `~N`: N generations back along first parents (`~` is `~1`)
//! - `^{tree}`, `^{commit}`, `^{}`: peel to a tree, a commit, or through tags

use rewind_refs::names::{is_pseudo_ref, validate_ref_name};
use rewind_refs::{RefStore, HEAD};
use rewind_store::{ObjectKind, ObjectStore, Tree};
use rewind_types::ObjectId;
use tracing::debug;

use crate::error::{ResetError, ResetResult};

/// Annotated tags nest at most this deep.
const MAX_TAG_DEPTH: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Parent(usize),
    Ancestor(usize),
    PeelTree,
    PeelCommit,
    PeelTags,
}

fn unresolvable(rev: &str, reason: impl Into<String>) -> ResetError {
    ResetError::UnresolvableRevision {
        rev: rev.to_string(),
        reason: reason.into(),
    }
}

fn parse(rev: &str) -> ResetResult<(&str, Vec<Step>)> {
    let split = rev.find(|c: char| c == '^' || c == '~').unwrap_or(rev.len());
    let (base, mut rest) = rev.split_at(split);
    if base.is_empty() {
        return Err(unresolvable(rev, "empty revision"));
    }

    let mut steps = Vec::new();
    while !rest.is_empty() {
        if let Some(inner) = rest.strip_prefix("^{") {
            let end = inner
                .find('}')
                .ok_or_else(|| unresolvable(rev, "unterminated '^{'"))?;
            steps.push(match &inner[..end] {
                "tree" => Step::PeelTree,
                "commit" => Step::PeelCommit,
                "" => Step::PeelTags,
                other => return Err(unresolvable(rev, format!("unknown peel target '{other}'"))),
            });
            rest = &inner[end + 1..];
            continue;
        }

        let (op, tail) = rest.split_at(1);
        let digits = tail.bytes().take_while(|b| b.is_ascii_digit()).count();
        let n = if digits == 0 {
            1
        } else {
            tail[..digits]
                .parse::<usize>()
                .map_err(|e| unresolvable(rev, e.to_string()))?
        };
        rest = &tail[digits..];
        steps.push(match op {
            "^" => Step::Parent(n),
            "~" => Step::Ancestor(n),
            _ => return Err(unresolvable(rev, format!("unexpected '{op}'"))),
        });
    }
    Ok((base, steps))
}

/// The object a reset moves to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    /// The revision as given (`HEAD` when implicit).
    pub rev: String,
    /// The commit, if the revision names one. `None` for bare trees and the
    /// unborn case.
    pub commit: Option<ObjectId>,
    /// The tree the index is reset to.
    pub tree: ObjectId,
    /// `HEAD` was named but does not point at a commit yet. The target is
    /// then the empty tree.
    pub unborn: bool,
}

/// Resolves revision strings against an object store and a ref store.
pub struct Resolver<'a> {
    objects: &'a dyn ObjectStore,
    refs: &'a dyn RefStore,
}

impl<'a> Resolver<'a> {
    pub fn new(objects: &'a dyn ObjectStore, refs: &'a dyn RefStore) -> Self {
        Self { objects, refs }
    }

    /// Resolve the target of a reset.
    ///
    /// `None` means `HEAD`. With `tree_ish` the revision may name any
    /// tree-bearing object; otherwise it must reach a commit.
    pub fn target(&self, rev: Option<&str>, tree_ish: bool) -> ResetResult<Target> {
        let rev = rev.unwrap_or(HEAD);
        if rev == HEAD && self.refs.resolve(HEAD)?.is_none() {
            debug!("HEAD is unborn; resetting to the empty tree");
            return Ok(Target {
                rev: rev.to_string(),
                commit: None,
                tree: Tree::empty_id(),
                unborn: true,
            });
        }

        let id = self.resolve(rev)?;
        let (commit, tree) = if tree_ish {
            let (peeled, kind) = self.peel_tags(rev, id)?;
            let commit = (kind == ObjectKind::Commit).then_some(peeled);
            (commit, self.peel_to_tree(rev, peeled)?)
        } else {
            let commit = self.peel_to_commit(rev, id)?;
            (Some(commit), self.objects.read_commit(&commit)?.tree)
        };

        debug!(
            rev,
            commit = ?commit.map(|c| c.short_hex()),
            tree = %tree.short_hex(),
            "revision resolved"
        );
        Ok(Target {
            rev: rev.to_string(),
            commit,
            tree,
            unborn: false,
        })
    }

    /// Resolve `rev` to an object id, applying every suffix.
    pub fn resolve(&self, rev: &str) -> ResetResult<ObjectId> {
        let (base, steps) = parse(rev)?;
        let mut id = self.resolve_base(rev, base)?;

        for step in steps {
            id = match step {
                Step::Parent(0) => self.peel_to_commit(rev, id)?,
                Step::Parent(n) => {
                    let commit = self.peel_to_commit(rev, id)?;
                    let parents = self.objects.read_commit(&commit)?.parents;
                    *parents.get(n - 1).ok_or_else(|| {
                        unresolvable(rev, format!("{} has no parent {n}", commit.short_hex()))
                    })?
                }
                Step::Ancestor(n) => {
                    let mut commit = self.peel_to_commit(rev, id)?;
                    for _ in 0..n {
                        let parents = self.objects.read_commit(&commit)?.parents;
                        commit = *parents.first().ok_or_else(|| {
                            unresolvable(rev, format!("{} has no parent", commit.short_hex()))
                        })?;
                    }
                    commit
                }
                Step::PeelTree => self.peel_to_tree(rev, id)?,
                Step::PeelCommit => self.peel_to_commit(rev, id)?,
                Step::PeelTags => self.peel_tags(rev, id)?.0,
            };
        }
        Ok(id)
    }

    fn resolve_base(&self, rev: &str, base: &str) -> ResetResult<ObjectId> {
        if ObjectId::is_full_hex(base) {
            let id = ObjectId::from_hex(base).map_err(|e| unresolvable(rev, e.to_string()))?;
            if self.objects.kind_of(&id)?.is_none() {
                return Err(unresolvable(rev, format!("object {} not found", id.short_hex())));
            }
            return Ok(id);
        }

        let base = if base == "@" { HEAD } else { base };
        let candidates: Vec<String> = if base.starts_with("refs/") {
            vec![base.to_string()]
        } else {
            let mut names = Vec::with_capacity(4);
            if is_pseudo_ref(base) {
                names.push(base.to_string());
            }
            names.push(format!("refs/{base}"));
            names.push(format!("refs/tags/{base}"));
            names.push(format!("refs/heads/{base}"));
            names
        };

        for name in candidates.iter().filter(|n| validate_ref_name(n).is_ok()) {
            if let Some(id) = self.refs.resolve(name)? {
                return Ok(id);
            }
        }
        Err(unresolvable(rev, "unknown revision"))
    }

    fn kind(&self, rev: &str, id: ObjectId) -> ResetResult<ObjectKind> {
        self.objects
            .kind_of(&id)?
            .ok_or_else(|| unresolvable(rev, format!("object {} not found", id.short_hex())))
    }

    /// Follow annotated tags to the first non-tag object.
    fn peel_tags(&self, rev: &str, mut id: ObjectId) -> ResetResult<(ObjectId, ObjectKind)> {
        for _ in 0..MAX_TAG_DEPTH {
            match self.kind(rev, id)? {
                ObjectKind::Tag => id = self.objects.read_tag(&id)?.target,
                kind => return Ok((id, kind)),
            }
        }
        Err(unresolvable(rev, "tags nest too deeply"))
    }

    /// Peel `id` to a commit.
    pub fn peel_to_commit(&self, rev: &str, id: ObjectId) -> ResetResult<ObjectId> {
        match self.peel_tags(rev, id)? {
            (commit, ObjectKind::Commit) => Ok(commit),
            (other, kind) => Err(unresolvable(
                rev,
                format!("{} is a {kind}, not a commit", other.short_hex()),
            )),
        }
    }

    /// Peel `id` to a tree.
    pub fn peel_to_tree(&self, rev: &str, id: ObjectId) -> ResetResult<ObjectId> {
        match self.peel_tags(rev, id)? {
            (commit, ObjectKind::Commit) => Ok(self.objects.read_commit(&commit)?.tree),
            (tree, ObjectKind::Tree) => Ok(tree),
            (other, kind) => Err(unresolvable(
                rev,
                format!("{} is a {kind}, not a tree", other.short_hex()),
            )),
        }
    }
}
