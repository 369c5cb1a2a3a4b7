//! Read-only projections of remote GitHub resources.
//!
//! These are fetched fresh for every operation and never cached: the remote
//! repository is the single source of truth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{IssueNumber, PrNumber, Sha};

/// An issue as returned by the issues API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: IssueNumber,
    pub title: String,
    /// The issue body. GitHub returns `null` for issues created without one.
    pub body: Option<String>,
}

impl Issue {
    /// Returns the body, or an empty string when the issue has none.
    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

/// A pull request as returned by the pulls API or carried in an event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: PrNumber,
    pub title: String,
    pub body: Option<String>,
    /// Whether the PR was merged. Only meaningful once the PR is closed.
    pub merged: bool,
    pub merged_at: Option<DateTime<Utc>>,
    /// The head branch name. Missing when the source repository was deleted.
    pub head_ref: Option<String>,
    /// The author's login. Missing for ghost users.
    pub author_login: Option<String>,
    pub html_url: Option<String>,
    /// Number of changed files, when the API reports it.
    pub changed_files: Option<u64>,
}

/// One entry of a pull request's changed-file listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub filename: String,
    /// `added`, `modified`, `removed`, `renamed`, ...
    pub status: String,
    pub additions: u64,
    pub deletions: u64,
    /// Unified diff hunk. Omitted by GitHub for binary or very large files.
    pub patch: Option<String>,
}

/// A file's decoded content together with its version token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSnapshot {
    pub path: String,
    pub content: String,
    pub sha: Sha,
}

/// The identity of a freshly opened pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedPullRequest {
    pub number: PrNumber,
    pub html_url: String,
}
