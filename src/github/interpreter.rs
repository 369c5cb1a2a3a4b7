//! GitHub effect interpreter using octocrab.
//!
//! This module implements the `GitHubInterpreter` trait, executing GitHub effects
//! against the real GitHub REST API via octocrab's raw route helpers.
//!
//! Key implementation details:
//! - One API call per effect; no retry here (the gateway's executor retries)
//! - Every call is bounded by the client's time budget
//! - Responses are deserialized into minimal raw structs and projected into
//!   domain types, so unknown fields never break parsing

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::effects::{EncodedFile, GitHubEffect, GitHubInterpreter, GitHubResponse};
use crate::types::{
    ChangedFile, CommentId, CreatedPullRequest, Issue, IssueNumber, PrNumber, PullRequest, RepoId,
    Sha, TreeEntry, TreeEntryKind,
};

use super::client::OctocrabClient;
use super::error::GitHubApiError;

// ─── Interpreter Implementation ───────────────────────────────────────────────

impl GitHubInterpreter for OctocrabClient {
    async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, GitHubApiError> {
        let name = effect.name();
        match tokio::time::timeout(self.timeout(), execute_effect(self, effect)).await {
            Ok(result) => result,
            Err(_) => Err(GitHubApiError::timeout(name, self.timeout())),
        }
    }
}

/// Executes a single effect without retry logic.
async fn execute_effect(
    client: &OctocrabClient,
    effect: GitHubEffect,
) -> Result<GitHubResponse, GitHubApiError> {
    match effect {
        GitHubEffect::GetIssue { repo, issue } => get_issue(client, &repo, issue).await,
        GitHubEffect::GetPullRequest { repo, pr } => get_pull_request(client, &repo, pr).await,
        GitHubEffect::ListPullRequestFiles { repo, pr } => {
            list_pull_request_files(client, &repo, pr).await
        }
        GitHubEffect::GetTree { repo, branch } => get_tree(client, &repo, &branch).await,
        GitHubEffect::GetFileContent { repo, path, branch } => {
            get_file_content(client, &repo, &path, &branch).await
        }
        GitHubEffect::GetBranchHead { repo, branch } => {
            get_branch_head(client, &repo, &branch).await
        }
        GitHubEffect::CreateBranchRef { repo, branch, sha } => {
            create_branch_ref(client, &repo, &branch, &sha).await
        }
        GitHubEffect::PutFile {
            repo,
            path,
            content_base64,
            message,
            branch,
            sha,
        } => {
            let request = PutFileRequest {
                message: &message,
                content: &content_base64,
                branch: &branch,
                sha: sha.as_ref().map(Sha::as_str),
            };
            put_file(client, &repo, &path, &request).await
        }
        GitHubEffect::CreatePullRequest {
            repo,
            head,
            base,
            title,
            body,
        } => {
            let request = CreatePullRequestRequest {
                title: &title,
                head: &head,
                base: &base,
                body: &body,
            };
            create_pull_request(client, &repo, &request).await
        }
        GitHubEffect::PostComment { repo, issue, body } => {
            post_comment(client, &repo, issue, &body).await
        }
    }
}

fn repo_route(repo: &RepoId, rest: &str) -> String {
    format!("/repos/{}/{}/{}", repo.owner, repo.repo, rest)
}

/// URL-encodes each segment of a slash-separated path, keeping the slashes.
///
/// e.g., "docs/release notes#2.md" -> "docs/release%20notes%232.md"
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

// ─── Issues & Pull Requests ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawIssue {
    number: u64,
    title: String,
    body: Option<String>,
}

async fn get_issue(
    client: &OctocrabClient,
    repo: &RepoId,
    issue: IssueNumber,
) -> Result<GitHubResponse, GitHubApiError> {
    let route = repo_route(repo, &format!("issues/{}", issue.0));
    let raw: RawIssue = client
        .inner()
        .get(route, None::<&()>)
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::Issue(Issue {
        number: IssueNumber(raw.number),
        title: raw.title,
        body: raw.body,
    }))
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    number: u64,
    title: Option<String>,
    body: Option<String>,
    merged: Option<bool>,
    merged_at: Option<DateTime<Utc>>,
    head: Option<RawHead>,
    user: Option<RawUser>,
    html_url: Option<String>,
    changed_files: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawHead {
    #[serde(rename = "ref")]
    ref_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    login: Option<String>,
}

async fn get_pull_request(
    client: &OctocrabClient,
    repo: &RepoId,
    pr: PrNumber,
) -> Result<GitHubResponse, GitHubApiError> {
    let route = repo_route(repo, &format!("pulls/{}", pr.0));
    let raw: RawPullRequest = client
        .inner()
        .get(route, None::<&()>)
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::PullRequest(PullRequest {
        number: PrNumber(raw.number),
        title: raw.title.unwrap_or_default(),
        body: raw.body,
        merged: raw.merged.unwrap_or(raw.merged_at.is_some()),
        merged_at: raw.merged_at,
        head_ref: raw.head.and_then(|h| h.ref_name),
        author_login: raw.user.and_then(|u| u.login),
        html_url: raw.html_url,
        changed_files: raw.changed_files,
    }))
}

#[derive(Debug, Deserialize)]
struct RawChangedFile {
    filename: String,
    status: String,
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
    patch: Option<String>,
}

#[derive(Serialize)]
struct PageQuery {
    per_page: u8,
}

async fn list_pull_request_files(
    client: &OctocrabClient,
    repo: &RepoId,
    pr: PrNumber,
) -> Result<GitHubResponse, GitHubApiError> {
    // A single page of 100 is plenty for a summary prompt.
    let route = repo_route(repo, &format!("pulls/{}/files", pr.0));
    let raw: Vec<RawChangedFile> = client
        .inner()
        .get(route, Some(&PageQuery { per_page: 100 }))
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    let files = raw
        .into_iter()
        .map(|f| ChangedFile {
            filename: f.filename,
            status: f.status,
            additions: f.additions,
            deletions: f.deletions,
            patch: f.patch,
        })
        .collect();

    Ok(GitHubResponse::PullRequestFiles(files))
}

// ─── Trees & Contents ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawTree {
    #[serde(default)]
    tree: Vec<RawTreeEntry>,
}

#[derive(Debug, Deserialize)]
struct RawTreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Serialize)]
struct RecursiveQuery {
    recursive: &'static str,
}

/// Maps a git object type string onto a tree entry kind.
fn parse_tree_entry_kind(kind: &str) -> Option<TreeEntryKind> {
    match kind {
        "blob" => Some(TreeEntryKind::Blob),
        "tree" => Some(TreeEntryKind::Tree),
        "commit" => Some(TreeEntryKind::Commit),
        _ => None,
    }
}

async fn get_tree(
    client: &OctocrabClient,
    repo: &RepoId,
    branch: &str,
) -> Result<GitHubResponse, GitHubApiError> {
    // The tree endpoint takes a single ref segment, so "fix/x" becomes "fix%2Fx".
    let route = repo_route(repo, &format!("git/trees/{}", urlencoding::encode(branch)));
    let raw: RawTree = client
        .inner()
        .get(route, Some(&RecursiveQuery { recursive: "1" }))
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    let entries = raw
        .tree
        .into_iter()
        .filter_map(|entry| match parse_tree_entry_kind(&entry.kind) {
            Some(kind) => Some(TreeEntry::new(entry.path, kind)),
            None => {
                tracing::debug!(
                    path = %entry.path,
                    kind = %entry.kind,
                    "Skipping unknown tree entry type"
                );
                None
            }
        })
        .collect();

    Ok(GitHubResponse::Tree(entries))
}

#[derive(Debug, Deserialize)]
struct RawContent {
    path: String,
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Serialize)]
struct RefQuery<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
}

async fn get_file_content(
    client: &OctocrabClient,
    repo: &RepoId,
    path: &str,
    branch: &str,
) -> Result<GitHubResponse, GitHubApiError> {
    let route = repo_route(repo, &format!("contents/{}", encode_path(path)));
    let raw: RawContent = client
        .inner()
        .get(route, Some(&RefQuery { git_ref: branch }))
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::FileContent(EncodedFile {
        path: raw.path,
        content_base64: raw.content,
        sha: Sha::new(raw.sha),
    }))
}

// ─── Refs ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawRef {
    object: RawRefObject,
}

#[derive(Debug, Deserialize)]
struct RawRefObject {
    sha: String,
}

async fn get_branch_head(
    client: &OctocrabClient,
    repo: &RepoId,
    branch: &str,
) -> Result<GitHubResponse, GitHubApiError> {
    let route = repo_route(repo, &format!("git/ref/heads/{}", encode_path(branch)));
    let raw: RawRef = client
        .inner()
        .get(route, None::<&()>)
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::BranchHead(Sha::new(raw.object.sha)))
}

#[derive(Serialize)]
struct CreateRefRequest<'a> {
    #[serde(rename = "ref")]
    ref_name: String,
    sha: &'a str,
}

async fn create_branch_ref(
    client: &OctocrabClient,
    repo: &RepoId,
    branch: &str,
    sha: &Sha,
) -> Result<GitHubResponse, GitHubApiError> {
    let request = CreateRefRequest {
        ref_name: format!("refs/heads/{}", branch),
        sha: sha.as_str(),
    };

    let _: serde_json::Value = client
        .inner()
        .post(repo_route(repo, "git/refs"), Some(&request))
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::BranchCreated)
}

// ─── File Writes ──────────────────────────────────────────────────────────────

/// Body of `PUT /repos/{owner}/{repo}/contents/{path}`.
///
/// `sha` is omitted entirely (not sent as `null`) when creating a file.
#[derive(Debug, Serialize)]
pub(crate) struct PutFileRequest<'a> {
    pub message: &'a str,
    pub content: &'a str,
    pub branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutFileResponse {
    commit: RawRefObject,
}

async fn put_file(
    client: &OctocrabClient,
    repo: &RepoId,
    path: &str,
    request: &PutFileRequest<'_>,
) -> Result<GitHubResponse, GitHubApiError> {
    let route = repo_route(repo, &format!("contents/{}", encode_path(path)));
    let response: PutFileResponse = client
        .inner()
        .put(route, Some(request))
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::FileCommitted {
        commit_sha: Sha::new(response.commit.sha),
    })
}

// ─── Pull Request Creation ────────────────────────────────────────────────────

#[derive(Serialize)]
struct CreatePullRequestRequest<'a> {
    title: &'a str,
    head: &'a str,
    base: &'a str,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct RawCreatedPullRequest {
    number: u64,
    html_url: String,
}

async fn create_pull_request(
    client: &OctocrabClient,
    repo: &RepoId,
    request: &CreatePullRequestRequest<'_>,
) -> Result<GitHubResponse, GitHubApiError> {
    let raw: RawCreatedPullRequest = client
        .inner()
        .post(repo_route(repo, "pulls"), Some(request))
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::PullRequestCreated(CreatedPullRequest {
        number: PrNumber(raw.number),
        html_url: raw.html_url,
    }))
}

// ─── Comments ─────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct CommentRequest<'a> {
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    id: u64,
}

async fn post_comment(
    client: &OctocrabClient,
    repo: &RepoId,
    issue: IssueNumber,
    body: &str,
) -> Result<GitHubResponse, GitHubApiError> {
    let route = repo_route(repo, &format!("issues/{}/comments", issue.0));
    let raw: RawComment = client
        .inner()
        .post(route, Some(&CommentRequest { body }))
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::CommentPosted {
        id: CommentId(raw.id),
    })
}
