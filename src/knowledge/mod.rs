//! Recording merged pull requests in the external knowledge base.
//!
//! The knowledge base is maintained by the `know` command-line tool. A merged
//! pull request becomes one `know add` invocation; the tool's own git
//! integration is disabled with `--no-git`.

use std::future::Future;
use std::process::ExitStatus;
use std::sync::Arc;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::types::{PullRequest, RepoId};

/// Category every pull-request entry is filed under.
pub const CATEGORY: &str = "architecture";

/// Tag attached to every entry recorded on merge.
pub const MERGE_TAG: &str = "pr-merge";

const UNKNOWN: &str = "unknown";
const NO_DESCRIPTION: &str = "No description provided.";

/// One knowledge-base entry derived from a merged pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeEntry {
    pub title: String,
    pub author: String,
    pub branch: String,
    pub source: Option<String>,
    pub repo: String,
    pub tags: Vec<String>,
    pub content: String,
}

impl KnowledgeEntry {
    /// Builds the entry for a merged pull request, filling gaps with defaults.
    pub fn from_merged(repo: &RepoId, pr: &PullRequest) -> Self {
        let full_name = repo.full_name();
        let content = pr
            .body
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .unwrap_or(NO_DESCRIPTION)
            .to_string();

        Self {
            title: format!("PR #{}: {}", pr.number.0, pr.title),
            author: pr.author_login.clone().unwrap_or_else(|| UNKNOWN.into()),
            branch: pr.head_ref.clone().unwrap_or_else(|| UNKNOWN.into()),
            source: pr.html_url.clone(),
            tags: vec![MERGE_TAG.to_string(), full_name.clone()],
            repo: full_name,
            content,
        }
    }

    /// The arguments passed to the tool, excluding the program name.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "add".to_string(),
            self.title.clone(),
            "--category".into(),
            CATEGORY.into(),
            "--author".into(),
            self.author.clone(),
            "--branch".into(),
            self.branch.clone(),
        ];
        if let Some(source) = &self.source {
            args.push("--source".into());
            args.push(source.clone());
        }
        args.extend([
            "--repo".into(),
            self.repo.clone(),
            "--tags".into(),
            self.tags.join(","),
            "--content".into(),
            self.content.clone(),
            "--no-git".into(),
        ]);
        args
    }
}

/// Errors from recording an entry.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// Somewhere merged pull requests are recorded.
pub trait KnowledgeRecorder {
    fn record(
        &self,
        entry: &KnowledgeEntry,
    ) -> impl Future<Output = Result<(), KnowledgeError>> + Send;
}

impl<T> KnowledgeRecorder for Arc<T>
where
    T: KnowledgeRecorder + Send + Sync,
{
    fn record(
        &self,
        entry: &KnowledgeEntry,
    ) -> impl Future<Output = Result<(), KnowledgeError>> + Send {
        (**self).record(entry)
    }
}

/// Records entries by running the `know` executable.
#[derive(Debug, Clone)]
pub struct KnowCli {
    program: String,
}

impl KnowCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for KnowCli {
    fn default() -> Self {
        Self::new("know")
    }
}

impl KnowledgeRecorder for KnowCli {
    async fn record(&self, entry: &KnowledgeEntry) -> Result<(), KnowledgeError> {
        debug!(program = %self.program, title = %entry.title, "Recording knowledge entry");

        let output = Command::new(&self.program)
            .args(entry.args())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| KnowledgeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(KnowledgeError::CommandFailed {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!(repo = %entry.repo, title = %entry.title, "Recorded PR knowledge");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PrNumber;

    fn merged_pr() -> PullRequest {
        PullRequest {
            number: PrNumber(15),
            title: "Add authentication feature".into(),
            body: Some("Implements OAuth2 login flow.".into()),
            merged: true,
            merged_at: None,
            head_ref: Some("feat/auth".into()),
            author_login: Some("jordanpartridge".into()),
            html_url: Some("https://github.com/acme/triage/pull/15".into()),
            changed_files: None,
        }
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        let idx = args.iter().position(|a| a == flag)?;
        args.get(idx + 1).map(String::as_str)
    }

    #[test]
    fn args_for_merged_pr() {
        let repo = RepoId::new("acme", "triage");
        let args = KnowledgeEntry::from_merged(&repo, &merged_pr()).args();

        assert_eq!(args[0], "add");
        assert_eq!(args[1], "PR #15: Add authentication feature");
        assert_eq!(value_after(&args, "--category"), Some("architecture"));
        assert_eq!(value_after(&args, "--author"), Some("jordanpartridge"));
        assert_eq!(value_after(&args, "--branch"), Some("feat/auth"));
        assert_eq!(
            value_after(&args, "--source"),
            Some("https://github.com/acme/triage/pull/15")
        );
        assert_eq!(value_after(&args, "--repo"), Some("acme/triage"));
        assert_eq!(value_after(&args, "--tags"), Some("pr-merge,acme/triage"));
        assert_eq!(
            value_after(&args, "--content"),
            Some("Implements OAuth2 login flow.")
        );
        assert_eq!(args.last().map(String::as_str), Some("--no-git"));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let repo = RepoId::new("acme", "triage");
        let pr = PullRequest {
            body: None,
            head_ref: None,
            author_login: None,
            html_url: None,
            ..merged_pr()
        };
        let args = KnowledgeEntry::from_merged(&repo, &pr).args();

        assert_eq!(value_after(&args, "--author"), Some("unknown"));
        assert_eq!(value_after(&args, "--branch"), Some("unknown"));
        assert_eq!(value_after(&args, "--content"), Some(NO_DESCRIPTION));
        assert!(!args.iter().any(|a| a == "--source"));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let cli = KnowCli::new("definitely-not-a-real-know-binary");
        let entry = KnowledgeEntry::from_merged(&RepoId::new("a", "b"), &merged_pr());

        let err = cli.record(&entry).await.unwrap_err();
        assert!(matches!(err, KnowledgeError::Spawn { .. }));
    }
}
