//! The repository gateway: typed GitHub operations with retry.
//!
//! Each method builds one or more [`GitHubEffect`]s, runs them through the
//! [`Executor`], and projects the response into a domain type. Nothing reaches
//! the interpreter except through the executor.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::{debug, info, warn};

use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse};
use crate::retry::Executor;
use crate::types::{
    ChangedFile, CommentId, CreatedPullRequest, FileSnapshot, Issue, IssueNumber, PrNumber,
    PullRequest, RepoId, RepoTree, Sha,
};

use super::error::{GatewayError, GitHubApiError};

/// Branch used when no other is given.
pub const DEFAULT_BRANCH: &str = "main";

/// Typed access to the GitHub API.
#[derive(Debug, Clone)]
pub struct GitHubGateway<I> {
    interpreter: I,
    executor: Executor,
}

impl<I> GitHubGateway<I>
where
    I: GitHubInterpreter + Sync,
{
    pub fn new(interpreter: I, executor: Executor) -> Self {
        Self {
            interpreter,
            executor,
        }
    }

    pub fn interpreter(&self) -> &I {
        &self.interpreter
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Runs a single effect under the executor.
    async fn run(&self, label: &str, effect: GitHubEffect) -> Result<GitHubResponse, GatewayError> {
        debug!(effect = effect.name(), repo = %effect.repo(), "Executing GitHub effect");
        let interpreter = &self.interpreter;
        let response = self
            .executor
            .execute(label, || interpreter.interpret(effect.clone()))
            .await?;
        Ok(response)
    }

    /// Fetches an issue.
    pub async fn get_issue(
        &self,
        repo: &RepoId,
        issue: IssueNumber,
    ) -> Result<Issue, GatewayError> {
        let effect = GitHubEffect::GetIssue {
            repo: repo.clone(),
            issue,
        };
        match self.run("get issue", effect).await? {
            GitHubResponse::Issue(issue) => Ok(issue),
            other => Err(GatewayError::unexpected("get_issue", &other)),
        }
    }

    /// Fetches a pull request.
    pub async fn get_pull_request(
        &self,
        repo: &RepoId,
        pr: PrNumber,
    ) -> Result<PullRequest, GatewayError> {
        let effect = GitHubEffect::GetPullRequest {
            repo: repo.clone(),
            pr,
        };
        match self.run("get pull request", effect).await? {
            GitHubResponse::PullRequest(pull) => Ok(pull),
            other => Err(GatewayError::unexpected("get_pull_request", &other)),
        }
    }

    /// Lists the files a pull request changes.
    pub async fn get_pull_request_files(
        &self,
        repo: &RepoId,
        pr: PrNumber,
    ) -> Result<Vec<ChangedFile>, GatewayError> {
        let effect = GitHubEffect::ListPullRequestFiles {
            repo: repo.clone(),
            pr,
        };
        match self.run("list pull request files", effect).await? {
            GitHubResponse::PullRequestFiles(files) => Ok(files),
            other => Err(GatewayError::unexpected("get_pull_request_files", &other)),
        }
    }

    /// Lists the repository's files at `branch`.
    ///
    /// This operation fails soft: once retries are exhausted (or the response
    /// is unusable) it logs and returns an empty tree. File selection copes
    /// with having no candidates.
    pub async fn get_repo_tree(&self, repo: &RepoId, branch: &str) -> RepoTree {
        let effect = GitHubEffect::GetTree {
            repo: repo.clone(),
            branch: branch.to_string(),
        };
        match self.run("get repo tree", effect).await {
            Ok(GitHubResponse::Tree(entries)) => {
                let tree = RepoTree::from_entries(entries);
                debug!(repo = %repo, branch, files = tree.len(), "Fetched repository tree");
                tree
            }
            Ok(other) => {
                warn!(
                    repo = %repo,
                    branch,
                    response = other.name(),
                    "Unexpected tree response; using empty tree"
                );
                RepoTree::default()
            }
            Err(e) => {
                warn!(
                    repo = %repo,
                    branch,
                    error = %e,
                    "Failed to list repository tree; using empty tree"
                );
                RepoTree::default()
            }
        }
    }

    /// Reads a file and decodes its base64 transport encoding.
    pub async fn get_file_content(
        &self,
        repo: &RepoId,
        path: &str,
        branch: &str,
    ) -> Result<FileSnapshot, GatewayError> {
        let effect = GitHubEffect::GetFileContent {
            repo: repo.clone(),
            path: path.to_string(),
            branch: branch.to_string(),
        };
        let encoded = match self.run("get file content", effect).await? {
            GitHubResponse::FileContent(file) => file,
            other => return Err(GatewayError::unexpected("get_file_content", &other)),
        };

        let content = decode_content(&encoded.content_base64).map_err(|source| {
            GatewayError::InvalidContent {
                path: path.to_string(),
                source,
            }
        })?;

        Ok(FileSnapshot {
            path: path.to_string(),
            content,
            sha: encoded.sha,
        })
    }

    /// Creates branch `name` at the current head of `from_branch`.
    ///
    /// Both calls run inside one retry envelope: if creating the ref fails,
    /// the next attempt resolves the head again. Creating a branch that
    /// already exists fails.
    pub async fn create_branch(
        &self,
        repo: &RepoId,
        name: &str,
        from_branch: &str,
    ) -> Result<(), GatewayError> {
        let interpreter = &self.interpreter;
        let head = self
            .executor
            .execute("create branch", || async move {
                let head = match interpreter
                    .interpret(GitHubEffect::GetBranchHead {
                        repo: repo.clone(),
                        branch: from_branch.to_string(),
                    })
                    .await?
                {
                    GitHubResponse::BranchHead(sha) => sha,
                    other => {
                        return Err(GitHubApiError::unexpected_response("get_branch_head", &other));
                    }
                };

                match interpreter
                    .interpret(GitHubEffect::CreateBranchRef {
                        repo: repo.clone(),
                        branch: name.to_string(),
                        sha: head.clone(),
                    })
                    .await?
                {
                    GitHubResponse::BranchCreated => Ok(head),
                    other => Err(GitHubApiError::unexpected_response(
                        "create_branch_ref",
                        &other,
                    )),
                }
            })
            .await?;

        info!(
            repo = %repo,
            branch = name,
            from = from_branch,
            head = head.short(),
            "Created branch"
        );
        Ok(())
    }

    /// Writes `content` to `path` on `branch` as a single commit.
    ///
    /// Pass the file's current `sha` to update it; pass `None` to create it.
    pub async fn commit_file(
        &self,
        repo: &RepoId,
        path: &str,
        content: &str,
        message: &str,
        branch: &str,
        sha: Option<&Sha>,
    ) -> Result<Sha, GatewayError> {
        let effect = GitHubEffect::PutFile {
            repo: repo.clone(),
            path: path.to_string(),
            content_base64: BASE64.encode(content.as_bytes()),
            message: message.to_string(),
            branch: branch.to_string(),
            sha: sha.cloned(),
        };
        match self.run("commit file", effect).await? {
            GitHubResponse::FileCommitted { commit_sha } => {
                debug!(
                    repo = %repo,
                    path,
                    branch,
                    commit = commit_sha.short(),
                    update = sha.is_some(),
                    "Committed file"
                );
                Ok(commit_sha)
            }
            other => Err(GatewayError::unexpected("commit_file", &other)),
        }
    }

    /// Opens a pull request from `head` into `base`.
    pub async fn create_pull_request(
        &self,
        repo: &RepoId,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<CreatedPullRequest, GatewayError> {
        let effect = GitHubEffect::CreatePullRequest {
            repo: repo.clone(),
            head: head.to_string(),
            base: base.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        };
        match self.run("create pull request", effect).await? {
            GitHubResponse::PullRequestCreated(created) => Ok(created),
            other => Err(GatewayError::unexpected("create_pull_request", &other)),
        }
    }

    /// Posts a comment on an issue or pull request.
    ///
    /// Callers reporting a different primary result should wrap this in
    /// [`crate::best_effort::best_effort`].
    pub async fn post_comment(
        &self,
        repo: &RepoId,
        issue: IssueNumber,
        body: &str,
    ) -> Result<CommentId, GatewayError> {
        let effect = GitHubEffect::PostComment {
            repo: repo.clone(),
            issue,
            body: body.to_string(),
        };
        match self.run("post comment", effect).await? {
            GitHubResponse::CommentPosted { id } => Ok(id),
            other => Err(GatewayError::unexpected("post_comment", &other)),
        }
    }
}

/// Decodes GitHub's base64 file content, which is wrapped at 60 columns.
fn decode_content(encoded: &str) -> Result<String, base64::DecodeError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = BASE64.decode(compact)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::effects::EncodedFile;
    use crate::retry::RetryConfig;
    use crate::test_utils::{MockGitHub, RecordingDelay, server_error};
    use crate::types::{TreeEntry, TreeEntryKind};

    fn gateway(
        mock: &Arc<MockGitHub>,
        recorder: &RecordingDelay,
    ) -> GitHubGateway<Arc<MockGitHub>> {
        GitHubGateway::new(
            mock.clone(),
            Executor::new(RetryConfig::DEFAULT, recorder.delay()),
        )
    }

    fn repo() -> RepoId {
        RepoId::new("owner", "repo")
    }

    #[tokio::test]
    async fn get_issue_retries_then_returns_value_unchanged() {
        let mut failures = 2;
        let mock = Arc::new(MockGitHub::new(move |_| {
            if failures > 0 {
                failures -= 1;
                return Err(server_error());
            }
            Ok(GitHubResponse::Issue(Issue {
                number: IssueNumber(42),
                title: "Auth bug".into(),
                body: None,
            }))
        }));
        let recorder = RecordingDelay::new();

        let issue = gateway(&mock, &recorder)
            .get_issue(&repo(), IssueNumber(42))
            .await
            .unwrap();

        assert_eq!(issue.title, "Auth bug");
        assert_eq!(mock.calls().len(), 3);
        assert_eq!(
            recorder.recorded(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn get_issue_surfaces_last_error_after_three_attempts() {
        let mut attempt = 0;
        let mock = Arc::new(MockGitHub::new(move |_| {
            attempt += 1;
            Err(GitHubApiError::from_status(500, format!("attempt {attempt}")))
        }));
        let recorder = RecordingDelay::new();

        let err = gateway(&mock, &recorder)
            .get_issue(&repo(), IssueNumber(42))
            .await
            .unwrap_err();

        assert_eq!(err.api_error().unwrap().message, "attempt 3");
        assert_eq!(recorder.recorded().len(), 2);
    }

    #[tokio::test]
    async fn permanent_errors_are_retried_like_transient_ones() {
        let mock = Arc::new(MockGitHub::new(|_| {
            Err(GitHubApiError::from_status(422, "Validation Failed"))
        }));
        let recorder = RecordingDelay::new();

        let _ = gateway(&mock, &recorder)
            .get_issue(&repo(), IssueNumber(1))
            .await;

        assert_eq!(mock.calls().len(), 3);
    }

    #[tokio::test]
    async fn repo_tree_is_filtered() {
        let mock = Arc::new(MockGitHub::new(|_| {
            Ok(GitHubResponse::Tree(vec![
                TreeEntry::blob("vendor/x"),
                TreeEntry::blob("node_modules/y"),
                TreeEntry::blob(".git/z"),
                TreeEntry::blob("storage/w"),
                TreeEntry::blob("app/Foo"),
                TreeEntry::new("app", TreeEntryKind::Tree),
            ]))
        }));
        let recorder = RecordingDelay::new();

        let tree = gateway(&mock, &recorder).get_repo_tree(&repo(), "main").await;

        assert_eq!(tree.paths(), ["app/Foo".to_string()]);
        assert_eq!(
            mock.calls()[0],
            GitHubEffect::GetTree {
                repo: repo(),
                branch: "main".into()
            }
        );
    }

    #[tokio::test]
    async fn repo_tree_degrades_to_empty_after_retries() {
        let mock = Arc::new(MockGitHub::new(|_| Err(server_error())));
        let recorder = RecordingDelay::new();

        let tree = gateway(&mock, &recorder).get_repo_tree(&repo(), "main").await;

        assert!(tree.is_empty());
        assert_eq!(mock.calls().len(), 3);
    }

    #[tokio::test]
    async fn file_content_is_decoded_with_its_sha() {
        let mock = Arc::new(MockGitHub::new(|_| {
            Ok(GitHubResponse::FileContent(EncodedFile {
                path: "app/User.php".into(),
                // "<?php\necho 'hi';\n" wrapped the way GitHub wraps it
                content_base64: "PD9waHAKZWNobyAnaGknOwo=\n".into(),
                sha: Sha::new("abc123"),
            }))
        }));
        let recorder = RecordingDelay::new();

        let file = gateway(&mock, &recorder)
            .get_file_content(&repo(), "app/User.php", "main")
            .await
            .unwrap();

        assert_eq!(file.content, "<?php\necho 'hi';\n");
        assert_eq!(file.sha, Sha::new("abc123"));
    }

    #[tokio::test]
    async fn invalid_base64_is_reported_with_path() {
        let mock = Arc::new(MockGitHub::new(|_| {
            Ok(GitHubResponse::FileContent(EncodedFile {
                path: "a.txt".into(),
                content_base64: "***".into(),
                sha: Sha::new("abc"),
            }))
        }));
        let recorder = RecordingDelay::new();

        let err = gateway(&mock, &recorder)
            .get_file_content(&repo(), "a.txt", "main")
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::InvalidContent { ref path, .. } if path == "a.txt"));
    }

    #[tokio::test]
    async fn create_branch_resolves_head_then_creates_ref() {
        let mock = Arc::new(MockGitHub::new(|effect| match effect {
            GitHubEffect::GetBranchHead { .. } => {
                Ok(GitHubResponse::BranchHead(Sha::new("c0ffee")))
            }
            GitHubEffect::CreateBranchRef { .. } => Ok(GitHubResponse::BranchCreated),
            other => panic!("unexpected effect {other:?}"),
        }));
        let recorder = RecordingDelay::new();

        gateway(&mock, &recorder)
            .create_branch(&repo(), "fix/issue-42", "main")
            .await
            .unwrap();

        assert_eq!(
            mock.calls(),
            vec![
                GitHubEffect::GetBranchHead {
                    repo: repo(),
                    branch: "main".into()
                },
                GitHubEffect::CreateBranchRef {
                    repo: repo(),
                    branch: "fix/issue-42".into(),
                    sha: Sha::new("c0ffee"),
                },
            ]
        );
    }

    #[tokio::test]
    async fn create_branch_retries_from_the_top() {
        let mut ref_attempts = 0;
        let mock = Arc::new(MockGitHub::new(move |effect| match effect {
            GitHubEffect::GetBranchHead { .. } => {
                Ok(GitHubResponse::BranchHead(Sha::new("c0ffee")))
            }
            GitHubEffect::CreateBranchRef { .. } => {
                ref_attempts += 1;
                if ref_attempts == 1 {
                    Err(server_error())
                } else {
                    Ok(GitHubResponse::BranchCreated)
                }
            }
            other => panic!("unexpected effect {other:?}"),
        }));
        let recorder = RecordingDelay::new();

        gateway(&mock, &recorder)
            .create_branch(&repo(), "fix/issue-42", "main")
            .await
            .unwrap();

        let names: Vec<_> = mock.calls().iter().map(GitHubEffect::name).collect();
        assert_eq!(
            names,
            vec![
                "get_branch_head",
                "create_branch_ref",
                "get_branch_head",
                "create_branch_ref"
            ]
        );
        assert_eq!(recorder.recorded(), vec![Duration::from_secs(1)]);
    }

    #[tokio::test]
    async fn existing_branch_fails_loudly() {
        let mock = Arc::new(MockGitHub::new(|effect| match effect {
            GitHubEffect::GetBranchHead { .. } => {
                Ok(GitHubResponse::BranchHead(Sha::new("c0ffee")))
            }
            _ => Err(GitHubApiError::from_status(422, "Reference already exists")),
        }));
        let recorder = RecordingDelay::new();

        let err = gateway(&mock, &recorder)
            .create_branch(&repo(), "fix/issue-42", "main")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Reference already exists"));
    }

    #[tokio::test]
    async fn commit_file_encodes_content_and_passes_sha() {
        let mock = Arc::new(MockGitHub::new(|_| {
            Ok(GitHubResponse::FileCommitted {
                commit_sha: Sha::new("1234567890"),
            })
        }));
        let recorder = RecordingDelay::new();
        let gw = gateway(&mock, &recorder);

        gw.commit_file(&repo(), "a.php", "<?php", "Update", "fix/x", Some(&Sha::new("abc")))
            .await
            .unwrap();
        gw.commit_file(&repo(), "b.php", "<?php", "Create", "fix/x", None)
            .await
            .unwrap();

        let calls = mock.calls();
        match &calls[0] {
            GitHubEffect::PutFile {
                content_base64,
                sha,
                ..
            } => {
                assert_eq!(content_base64, "PD9waHA=");
                assert_eq!(sha.as_ref(), Some(&Sha::new("abc")));
            }
            other => panic!("unexpected effect {other:?}"),
        }
        assert!(matches!(&calls[1], GitHubEffect::PutFile { sha: None, .. }));
    }

    #[tokio::test]
    async fn mismatched_response_is_an_error() {
        let mock = Arc::new(MockGitHub::new(|_| Ok(GitHubResponse::BranchCreated)));
        let recorder = RecordingDelay::new();

        let err = gateway(&mock, &recorder)
            .post_comment(&repo(), IssueNumber(1), "hi")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GatewayError::UnexpectedResponse {
                operation: "post_comment",
                ..
            }
        ));
    }
}
