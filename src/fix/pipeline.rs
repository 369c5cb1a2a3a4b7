//! The on-demand fix pipeline.
//!
//! Stages, strictly in order:
//!
//! 1. Fetch the issue and the repository tree
//! 2. Ask the model which files are relevant
//! 3. Fetch each selected file from the base branch
//! 4. Generate a fix plan (regenerated up to three times)
//! 5. Create the plan's branch and commit each change to it
//! 6. Open a pull request closing the issue
//! 7. Comment on the issue with a link to the pull request
//!
//! A failure in stages 1-6 is reported on the issue and returned. Comments are
//! best-effort: a failed comment never replaces the result being reported.

use thiserror::Error;
use tracing::{error, info};

use crate::best_effort::best_effort;
use crate::effects::GitHubInterpreter;
use crate::github::{DEFAULT_BRANCH, GatewayError, GitHubGateway};
use crate::llm::LanguageModel;
use crate::types::{CreatedPullRequest, FileSnapshot, FixPlan, Issue, IssueNumber, RepoId};

use super::generation::{GenerationError, generate_fix, generation_prompt, generation_system_prompt};
use super::selection::{SelectionError, select_files};

/// Errors that end a fix attempt.
#[derive(Debug, Error)]
pub enum FixError {
    #[error(transparent)]
    GitHub(#[from] GatewayError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// A successfully applied fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixOutcome {
    pub branch: String,
    pub pull_request: CreatedPullRequest,
    pub files_committed: usize,
}

/// Turns an issue into a pull request.
#[derive(Debug)]
pub struct FixPipeline<I, M> {
    gateway: GitHubGateway<I>,
    model: M,
    base_branch: String,
}

impl<I, M> FixPipeline<I, M>
where
    I: GitHubInterpreter + Sync,
    M: LanguageModel,
{
    pub fn new(gateway: GitHubGateway<I>, model: M) -> Self {
        Self {
            gateway,
            model,
            base_branch: DEFAULT_BRANCH.to_string(),
        }
    }

    /// Uses `branch` instead of `main` as the source of files and the PR base.
    pub fn with_base_branch(mut self, branch: impl Into<String>) -> Self {
        self.base_branch = branch.into();
        self
    }

    /// Runs the pipeline for `issue` and reports the outcome on the issue.
    pub async fn run(&self, repo: &RepoId, issue: IssueNumber) -> Result<FixOutcome, FixError> {
        match self.attempt(repo, issue).await {
            Ok(outcome) => {
                let body = format!(
                    "I've opened a PR with a proposed fix: {}",
                    outcome.pull_request.html_url
                );
                best_effort(
                    "post fix success comment",
                    self.gateway.post_comment(repo, issue, &body),
                )
                .await;
                info!(
                    repo = %repo,
                    issue = %issue,
                    url = %outcome.pull_request.html_url,
                    "PR created"
                );
                Ok(outcome)
            }
            Err(e) => {
                error!(repo = %repo, issue = %issue, error = %e, "Fix attempt failed");
                let body = format!("Fix attempt failed: {e}");
                best_effort(
                    "post fix failure comment",
                    self.gateway.post_comment(repo, issue, &body),
                )
                .await;
                Err(e)
            }
        }
    }

    /// Stages 1-6, without reporting.
    pub async fn attempt(
        &self,
        repo: &RepoId,
        number: IssueNumber,
    ) -> Result<FixOutcome, FixError> {
        info!(repo = %repo, issue = %number, "Fetching issue");
        let issue = self.gateway.get_issue(repo, number).await?;
        let tree = self.gateway.get_repo_tree(repo, &self.base_branch).await;

        info!(candidates = tree.len(), "Selecting relevant files");
        let selected = select_files(&self.model, self.gateway.executor(), &issue, &tree).await?;

        let mut snapshots = Vec::with_capacity(selected.len());
        for path in &selected {
            let file = self
                .gateway
                .get_file_content(repo, path, &self.base_branch)
                .await?;
            snapshots.push(file);
        }

        info!("Generating fix");
        let system = generation_system_prompt(repo, &tree, &snapshots);
        let plan = generate_fix(&self.model, &system, &generation_prompt(&issue)).await?;

        let files_committed = self.apply(repo, &plan, &snapshots).await?;
        let pull_request = self.open_pull_request(repo, &issue, &plan).await?;

        Ok(FixOutcome {
            branch: plan.branch_name,
            pull_request,
            files_committed,
        })
    }

    async fn apply(
        &self,
        repo: &RepoId,
        plan: &FixPlan,
        snapshots: &[FileSnapshot],
    ) -> Result<usize, FixError> {
        info!(branch = %plan.branch_name, "Creating branch");
        self.gateway
            .create_branch(repo, &plan.branch_name, &self.base_branch)
            .await?;

        for change in &plan.changes {
            // Only files fetched before generation have a version token;
            // anything else is created.
            let sha = snapshots
                .iter()
                .find(|s| s.path == change.path)
                .map(|s| &s.sha);
            self.gateway
                .commit_file(
                    repo,
                    &change.path,
                    &change.content,
                    &change.commit_message,
                    &plan.branch_name,
                    sha,
                )
                .await?;
        }
        Ok(plan.changes.len())
    }

    async fn open_pull_request(
        &self,
        repo: &RepoId,
        issue: &Issue,
        plan: &FixPlan,
    ) -> Result<CreatedPullRequest, FixError> {
        let title = format!("Fix #{}: {}", issue.number.0, issue.title);
        let body = format!(
            "## Summary\n\n{}\n\nCloses #{}",
            plan.summary, issue.number.0
        );
        let created = self
            .gateway
            .create_pull_request(repo, &plan.branch_name, &self.base_branch, &title, &body)
            .await?;
        Ok(created)
    }
}
