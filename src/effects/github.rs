//! GitHub API effect types.
//!
//! These types describe GitHub API operations as data, without executing them.
//! An interpreter executes a single effect against the API; the gateway
//! decides how effects are combined and retried.

use serde::{Deserialize, Serialize};

use crate::types::{
    ChangedFile, CommentId, CreatedPullRequest, Issue, IssueNumber, PrNumber, PullRequest, RepoId,
    Sha, TreeEntry,
};

/// A GitHub API effect.
///
/// Unlike a repo-scoped client, every effect names its repository: the bot
/// reacts to events from many repositories through one interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GitHubEffect {
    // ─── Queries ──────────────────────────────────────────────────────────────
    /// Fetch a single issue.
    GetIssue { repo: RepoId, issue: IssueNumber },

    /// Fetch a single pull request.
    GetPullRequest { repo: RepoId, pr: PrNumber },

    /// List the files changed by a pull request.
    ListPullRequestFiles { repo: RepoId, pr: PrNumber },

    /// Recursively list the git tree of a branch.
    GetTree { repo: RepoId, branch: String },

    /// Read a file's base64 content and blob SHA at a branch.
    GetFileContent {
        repo: RepoId,
        path: String,
        branch: String,
    },

    /// Resolve the commit a branch currently points at.
    GetBranchHead { repo: RepoId, branch: String },

    // ─── Mutations ────────────────────────────────────────────────────────────
    /// Create `refs/heads/<branch>` pointing at `sha`.
    CreateBranchRef {
        repo: RepoId,
        branch: String,
        sha: Sha,
    },

    /// Create or update a file on a branch.
    ///
    /// `sha` must be the current blob SHA when updating and `None` when
    /// creating; GitHub rejects an update without it with a conflict.
    PutFile {
        repo: RepoId,
        path: String,
        content_base64: String,
        message: String,
        branch: String,
        sha: Option<Sha>,
    },

    /// Open a pull request from `head` into `base`.
    CreatePullRequest {
        repo: RepoId,
        head: String,
        base: String,
        title: String,
        body: String,
    },

    /// Post a comment on an issue or pull request conversation.
    PostComment {
        repo: RepoId,
        issue: IssueNumber,
        body: String,
    },
}

impl GitHubEffect {
    /// A short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            GitHubEffect::GetIssue { .. } => "get_issue",
            GitHubEffect::GetPullRequest { .. } => "get_pull_request",
            GitHubEffect::ListPullRequestFiles { .. } => "list_pull_request_files",
            GitHubEffect::GetTree { .. } => "get_tree",
            GitHubEffect::GetFileContent { .. } => "get_file_content",
            GitHubEffect::GetBranchHead { .. } => "get_branch_head",
            GitHubEffect::CreateBranchRef { .. } => "create_branch_ref",
            GitHubEffect::PutFile { .. } => "put_file",
            GitHubEffect::CreatePullRequest { .. } => "create_pull_request",
            GitHubEffect::PostComment { .. } => "post_comment",
        }
    }

    /// The repository this effect targets.
    pub fn repo(&self) -> &RepoId {
        match self {
            GitHubEffect::GetIssue { repo, .. }
            | GitHubEffect::GetPullRequest { repo, .. }
            | GitHubEffect::ListPullRequestFiles { repo, .. }
            | GitHubEffect::GetTree { repo, .. }
            | GitHubEffect::GetFileContent { repo, .. }
            | GitHubEffect::GetBranchHead { repo, .. }
            | GitHubEffect::CreateBranchRef { repo, .. }
            | GitHubEffect::PutFile { repo, .. }
            | GitHubEffect::CreatePullRequest { repo, .. }
            | GitHubEffect::PostComment { repo, .. } => repo,
        }
    }
}

// ─── Response Types ───────────────────────────────────────────────────────────

/// A file as returned by the contents API, still transport-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedFile {
    pub path: String,
    /// Base64 content, possibly wrapped with newlines.
    pub content_base64: String,
    pub sha: Sha,
}

/// Response from a GitHub effect.
///
/// Each variant corresponds to the response from a particular effect type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GitHubResponse {
    /// Response to `GetIssue`.
    Issue(Issue),

    /// Response to `GetPullRequest`.
    PullRequest(PullRequest),

    /// Response to `ListPullRequestFiles`.
    PullRequestFiles(Vec<ChangedFile>),

    /// Response to `GetTree`, in the order GitHub listed it.
    Tree(Vec<TreeEntry>),

    /// Response to `GetFileContent`.
    FileContent(EncodedFile),

    /// Response to `GetBranchHead`.
    BranchHead(Sha),

    /// Response to `CreateBranchRef`.
    BranchCreated,

    /// Response to `PutFile`.
    FileCommitted {
        /// The SHA of the commit that wrote the file.
        commit_sha: Sha,
    },

    /// Response to `CreatePullRequest`.
    PullRequestCreated(CreatedPullRequest),

    /// Response to `PostComment`.
    CommentPosted {
        /// The ID of the newly created comment.
        id: CommentId,
    },
}

impl GitHubResponse {
    /// A short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            GitHubResponse::Issue(_) => "issue",
            GitHubResponse::PullRequest(_) => "pull_request",
            GitHubResponse::PullRequestFiles(_) => "pull_request_files",
            GitHubResponse::Tree(_) => "tree",
            GitHubResponse::FileContent(_) => "file_content",
            GitHubResponse::BranchHead(_) => "branch_head",
            GitHubResponse::BranchCreated => "branch_created",
            GitHubResponse::FileCommitted { .. } => "file_committed",
            GitHubResponse::PullRequestCreated(_) => "pull_request_created",
            GitHubResponse::CommentPosted { .. } => "comment_posted",
        }
    }
}
