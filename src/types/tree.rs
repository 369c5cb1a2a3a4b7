//! Repository file listings.

use serde::{Deserialize, Serialize};

/// Maximum number of paths kept in a [`RepoTree`].
pub const MAX_TREE_ENTRIES: usize = 50;

/// Path prefixes never offered to the model: dependencies, VCS internals and
/// framework storage.
pub const EXCLUDED_PREFIXES: [&str; 4] = ["vendor/", "node_modules/", ".git/", "storage/"];

/// The git object type of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeEntryKind {
    Blob,
    Tree,
    /// A submodule.
    Commit,
}

/// One entry of a recursive git tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub kind: TreeEntryKind,
}

impl TreeEntry {
    pub fn new(path: impl Into<String>, kind: TreeEntryKind) -> Self {
        TreeEntry {
            path: path.into(),
            kind,
        }
    }

    pub fn blob(path: impl Into<String>) -> Self {
        Self::new(path, TreeEntryKind::Blob)
    }
}

/// An ordered list of file paths in a repository, filtered for relevance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoTree(Vec<String>);

impl RepoTree {
    /// Builds a tree from a raw listing.
    ///
    /// Keeps blobs only, drops excluded prefixes, preserves source order and
    /// truncates to [`MAX_TREE_ENTRIES`].
    pub fn from_entries(entries: impl IntoIterator<Item = TreeEntry>) -> Self {
        let paths = entries
            .into_iter()
            .filter(|entry| entry.kind == TreeEntryKind::Blob)
            .filter(|entry| !is_excluded(&entry.path))
            .map(|entry| entry.path)
            .take(MAX_TREE_ENTRIES)
            .collect();
        RepoTree(paths)
    }

    pub fn paths(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.iter().any(|p| p == path)
    }
}

fn is_excluded(path: &str) -> bool {
    EXCLUDED_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}
