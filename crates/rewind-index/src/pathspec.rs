//! Literal path filters.

use serde::{Deserialize, Serialize};

/// A set of literal path patterns.
///
/// A pattern matches a path equal to it or any path below it (directory
/// prefix). An empty pathspec matches everything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pathspec {
    patterns: Vec<String>,
}

impl Pathspec {
    /// The empty pathspec: the whole tree.
    pub fn all() -> Self {
        Self::default()
    }

    /// Build a pathspec from patterns. Trailing slashes are dropped; a
    /// pattern of `.` or `""` widens the spec to the whole tree.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = Vec::new();
        for pattern in patterns {
            let p = pattern.as_ref().trim_end_matches('/');
            let p = p.strip_prefix("./").unwrap_or(p);
            if p.is_empty() || p == "." {
                out.clear();
                out.push(String::new());
                break;
            }
            if !out.iter().any(|existing| existing == p) {
                out.push(p.to_string());
            }
        }
        Self { patterns: out }
    }

    /// Returns `true` if no path restriction was given.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// The normalized patterns.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Returns `true` if `path` is selected.
    pub fn matches(&self, path: &str) -> bool {
        self.patterns.is_empty()
            || self.patterns.iter().any(|p| {
                p.is_empty()
                    || path == p
                    || (path.len() > p.len()
                        && path.starts_with(p.as_str())
                        && path.as_bytes()[p.len()] == b'/')
            })
    }
}
