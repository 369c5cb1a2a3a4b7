//! Triage handlers.
//!
//! Each [`Handler`] bound by the router is carried out here. Handlers talk to
//! GitHub through the [`GitHubGateway`] and to the model through the same
//! [`Executor`], so every outbound call is retried the same way.
//!
//! | Handler | Effect |
//! |---------|--------|
//! | `TriageIssue` | plan from the model, posted as an issue comment |
//! | `RetriageLabeledIssue` | plan with the label as context, posted as a comment |
//! | `SummarizePullRequest` | summary of the fetched PR and its files, posted as a comment |
//! | `RecordMergedPullRequest` | `know add ...`, failures logged and discarded |
//! | `SkipUnmergedPullRequest` | nothing |

use std::fmt::Write as _;
use std::future::Future;

use thiserror::Error;
use tracing::{debug, info};

use crate::best_effort::best_effort;
use crate::effects::GitHubInterpreter;
use crate::github::{GatewayError, GitHubGateway};
use crate::knowledge::{KnowledgeEntry, KnowledgeRecorder};
use crate::llm::{LanguageModel, LlmError};
use crate::retry::ExhaustedRetries;
use crate::types::{ChangedFile, Issue, IssueNumber, PullRequest};

use super::envelope::EventEnvelope;
use super::parser::{ParseError, parse_issue_event, parse_pull_request_event};
use super::router::Handler;

const TRIAGE_SYSTEM_PROMPT: &str = "You are a senior software engineer triaging GitHub issues. \
Read the issue and write a short implementation plan in markdown. \
State the problem in one or two sentences, then list concrete steps. \
If the issue does not contain enough detail to act on, say what is missing.";

const SUMMARY_SYSTEM_PROMPT: &str = "You are a senior software engineer \
reviewing a GitHub pull request. \
Summarize what the change does and call out anything a reviewer should look at closely. \
Answer in concise markdown.";

const NO_DESCRIPTION: &str = "(no description provided)";

/// Longest patch excerpt included per file in a PR summary prompt.
const MAX_PATCH_CHARS: usize = 4_000;

/// Errors that can occur while handling an event.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The payload lacks what the handler needs.
    #[error("invalid payload: {0}")]
    Payload(#[from] ParseError),

    /// A GitHub call failed.
    #[error(transparent)]
    GitHub(#[from] GatewayError),

    /// The model failed on every attempt.
    #[error(transparent)]
    Model(#[from] ExhaustedRetries<LlmError>),
}

/// Carries out a resolved handler for an envelope.
pub trait EventDispatcher {
    fn dispatch(
        &self,
        handler: Handler,
        envelope: &EventEnvelope,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send;
}

/// The production handlers.
#[derive(Debug)]
pub struct TriageHandlers<I, M, K> {
    gateway: GitHubGateway<I>,
    model: M,
    recorder: K,
}

impl<I, M, K> TriageHandlers<I, M, K>
where
    I: GitHubInterpreter + Send + Sync,
    M: LanguageModel + Send + Sync,
    K: KnowledgeRecorder + Send + Sync,
{
    pub fn new(gateway: GitHubGateway<I>, model: M, recorder: K) -> Self {
        Self {
            gateway,
            model,
            recorder,
        }
    }

    async fn ask(&self, label: &str, system: &str, prompt: &str) -> Result<String, HandlerError> {
        let model = &self.model;
        let reply = self
            .gateway
            .executor()
            .execute(label, || model.complete(system, prompt))
            .await?;
        Ok(reply.trim().to_string())
    }

    async fn triage_issue(&self, envelope: &EventEnvelope) -> Result<(), HandlerError> {
        let event = parse_issue_event(&envelope.payload)?;
        let prompt = issue_prompt(&event.issue, None);
        let plan = self
            .ask("triage plan", TRIAGE_SYSTEM_PROMPT, &prompt)
            .await?;

        self.gateway
            .post_comment(&event.repo, event.issue.number, &triage_comment(&plan, None))
            .await?;
        info!(repo = %event.repo, issue = %event.issue.number, "Posted triage plan");
        Ok(())
    }

    async fn retriage_labeled_issue(&self, envelope: &EventEnvelope) -> Result<(), HandlerError> {
        let event = parse_issue_event(&envelope.payload)?;
        let label = event.label.ok_or(ParseError::MissingField("label"))?;
        let prompt = issue_prompt(&event.issue, Some(&label));
        let plan = self
            .ask("re-triage plan", TRIAGE_SYSTEM_PROMPT, &prompt)
            .await?;

        self.gateway
            .post_comment(
                &event.repo,
                event.issue.number,
                &triage_comment(&plan, Some(&label)),
            )
            .await?;
        info!(
            repo = %event.repo,
            issue = %event.issue.number,
            label = %label,
            "Posted re-triage plan"
        );
        Ok(())
    }

    async fn summarize_pull_request(&self, envelope: &EventEnvelope) -> Result<(), HandlerError> {
        let event = parse_pull_request_event(&envelope.payload)?;
        let number = event.pull_request.number;

        let pr = self.gateway.get_pull_request(&event.repo, number).await?;
        let files = self
            .gateway
            .get_pull_request_files(&event.repo, number)
            .await?;
        let prompt = pull_request_prompt(&pr, &files);
        let summary = self
            .ask("pull request summary", SUMMARY_SYSTEM_PROMPT, &prompt)
            .await?;

        self.gateway
            .post_comment(
                &event.repo,
                IssueNumber::from(number),
                &format!("## 🤖 PR Summary\n\n{summary}"),
            )
            .await?;
        info!(repo = %event.repo, pr = %number, files = files.len(), "Posted PR summary");
        Ok(())
    }

    async fn record_merged_pull_request(
        &self,
        envelope: &EventEnvelope,
    ) -> Result<(), HandlerError> {
        let event = parse_pull_request_event(&envelope.payload)?;
        let entry = KnowledgeEntry::from_merged(&event.repo, &event.pull_request);
        best_effort("record PR knowledge", self.recorder.record(&entry)).await;
        Ok(())
    }
}

impl<I, M, K> EventDispatcher for TriageHandlers<I, M, K>
where
    I: GitHubInterpreter + Send + Sync,
    M: LanguageModel + Send + Sync,
    K: KnowledgeRecorder + Send + Sync,
{
    async fn dispatch(
        &self,
        handler: Handler,
        envelope: &EventEnvelope,
    ) -> Result<(), HandlerError> {
        debug!(handler = %handler, event_type = %envelope.event_type, "Dispatching event");
        match handler {
            Handler::TriageIssue => self.triage_issue(envelope).await,
            Handler::RetriageLabeledIssue => self.retriage_labeled_issue(envelope).await,
            Handler::SummarizePullRequest => self.summarize_pull_request(envelope).await,
            Handler::RecordMergedPullRequest => self.record_merged_pull_request(envelope).await,
            Handler::SkipUnmergedPullRequest => {
                debug!("Pull request closed without merging; nothing to do");
                Ok(())
            }
        }
    }
}

// ─── Prompt and comment formatting ────────────────────────────────────────────

fn body_or_placeholder(body: Option<&str>) -> &str {
    match body.map(str::trim) {
        Some(b) if !b.is_empty() => b,
        _ => NO_DESCRIPTION,
    }
}

fn issue_prompt(issue: &Issue, label: Option<&str>) -> String {
    let mut prompt = format!(
        "Issue #{}: {}\n\n{}",
        issue.number.0,
        issue.title,
        body_or_placeholder(issue.body.as_deref())
    );
    if let Some(label) = label {
        let _ = write!(
            prompt,
            "\n\nThe issue was just labeled `{label}`. Take the label into account when planning."
        );
    }
    prompt
}

fn triage_comment(plan: &str, label: Option<&str>) -> String {
    match label {
        Some(label) => format!("## 🤖 Triage Agent (re-triage: `{label}`)\n\n{plan}"),
        None => format!("## 🤖 Triage Agent\n\n{plan}"),
    }
}

fn pull_request_prompt(pr: &PullRequest, files: &[ChangedFile]) -> String {
    let mut prompt = format!(
        "Pull request #{}: {}\n\n{}\n\nChanged files:\n",
        pr.number.0,
        pr.title,
        body_or_placeholder(pr.body.as_deref())
    );
    for file in files {
        let _ = writeln!(
            prompt,
            "- {} ({}, +{}/-{})",
            file.filename, file.status, file.additions, file.deletions
        );
    }
    for file in files {
        if let Some(patch) = &file.patch {
            let excerpt: String = patch.chars().take(MAX_PATCH_CHARS).collect();
            let _ = write!(prompt, "\n--- {} ---\n{}\n", file.filename, excerpt);
        }
    }
    prompt
}
