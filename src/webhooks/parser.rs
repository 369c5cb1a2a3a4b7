//! Typed views of webhook payloads.
//!
//! The router only looks at `eventType`, `action` and `merged`. Handlers need
//! the repository and the issue or pull request, which this module extracts
//! from the envelope's payload.
//!
//! # Parsing Strategy
//!
//! 1. Deserialize into raw structs that mirror GitHub's JSON and use
//!    `Option<T>` liberally
//! 2. Check required pieces explicitly, reporting which one is missing
//! 3. Unknown fields are ignored

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::types::{InvalidRepoId, Issue, IssueNumber, PrNumber, PullRequest, RepoId};

/// Error type for payload parsing failures.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON deserialization failed (wrong types, missing scalar fields).
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A required object is absent from the payload.
    #[error("payload is missing {0}")]
    MissingField(&'static str),

    /// `repository.full_name` is not `owner/repo`.
    #[error(transparent)]
    InvalidRepo(#[from] InvalidRepoId),
}

/// An `issues` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueEvent {
    pub repo: RepoId,
    pub issue: Issue,
    /// The label just applied, for `labeled` events.
    pub label: Option<String>,
}

/// A `pull_request` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestEvent {
    pub repo: RepoId,
    pub pull_request: PullRequest,
}

// ============================================================================
// Raw payload structures for deserialization
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawRepository {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct RawIssuePayload {
    repository: Option<RawRepository>,
    issue: Option<RawIssue>,
    label: Option<RawLabel>,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    number: u64,
    #[serde(default)]
    title: String,
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawPullRequestPayload {
    repository: Option<RawRepository>,
    pull_request: Option<RawPullRequest>,
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    number: u64,
    #[serde(default)]
    title: String,
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

fn parse_repo(raw: Option<RawRepository>) -> Result<RepoId, ParseError> {
    let raw = raw.ok_or(ParseError::MissingField("repository"))?;
    Ok(RepoId::parse(&raw.full_name)?)
}

// ============================================================================
// Parsers
// ============================================================================

/// Parses the payload of an `issues` event.
pub fn parse_issue_event(payload: &Value) -> Result<IssueEvent, ParseError> {
    let raw = RawIssuePayload::deserialize(payload)?;
    let repo = parse_repo(raw.repository)?;
    let issue = raw.issue.ok_or(ParseError::MissingField("issue"))?;

    Ok(IssueEvent {
        repo,
        issue: Issue {
            number: IssueNumber(issue.number),
            title: issue.title,
            body: issue.body,
        },
        label: raw.label.map(|l| l.name),
    })
}

/// Parses the payload of a `pull_request` event.
pub fn parse_pull_request_event(payload: &Value) -> Result<PullRequestEvent, ParseError> {
    let raw = RawPullRequestPayload::deserialize(payload)?;
    let repo = parse_repo(raw.repository)?;
    let pr = raw
        .pull_request
        .ok_or(ParseError::MissingField("pull_request"))?;

    Ok(PullRequestEvent {
        repo,
        pull_request: PullRequest {
            number: PrNumber(pr.number),
            title: pr.title,
            body: pr.body,
            merged: pr.merged.unwrap_or(false),
            merged_at: pr.merged_at,
            head_ref: pr.head.and_then(|h| h.ref_name),
            author_login: pr.user.and_then(|u| u.login),
            html_url: pr.html_url,
            changed_files: pr.changed_files,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn issue_payload() -> Value {
        json!({
            "action": "opened",
            "repository": { "full_name": "acme/widgets" },
            "issue": {
                "number": 42,
                "title": "Add dark mode",
                "body": "We need a dark mode toggle in the settings page."
            }
        })
    }

    fn merged_payload() -> Value {
        json!({
            "action": "closed",
            "repository": { "full_name": "acme/widgets" },
            "pull_request": {
                "number": 15,
                "title": "Add authentication feature",
                "body": "Implements OAuth2 login flow.",
                "merged": true,
                "merged_at": "2025-01-15T10:30:00Z",
                "html_url": "https://github.com/acme/widgets/pull/15",
                "head": { "ref": "feat/auth" },
                "user": { "login": "octocat" }
            }
        })
    }

    #[test]
    fn parses_issue_event() {
        let event = parse_issue_event(&issue_payload()).unwrap();
        assert_eq!(event.repo, RepoId::new("acme", "widgets"));
        assert_eq!(event.issue.number, IssueNumber(42));
        assert_eq!(event.issue.title, "Add dark mode");
        assert_eq!(event.label, None);
    }

    #[test]
    fn parses_label() {
        let mut payload = issue_payload();
        payload["action"] = json!("labeled");
        payload["label"] = json!({ "name": "bug", "color": "d73a4a" });

        let event = parse_issue_event(&payload).unwrap();
        assert_eq!(event.label.as_deref(), Some("bug"));
    }

    #[test]
    fn null_issue_body_is_kept_as_none() {
        let mut payload = issue_payload();
        payload["issue"]["body"] = Value::Null;

        let event = parse_issue_event(&payload).unwrap();
        assert_eq!(event.issue.body, None);
        assert_eq!(event.issue.body_text(), "");
    }

    #[test]
    fn missing_issue_is_reported() {
        let payload = json!({ "repository": { "full_name": "acme/widgets" } });
        let err = parse_issue_event(&payload).unwrap_err();
        assert!(matches!(err, ParseError::MissingField("issue")));
    }

    #[test]
    fn bad_repo_name_is_reported() {
        let mut payload = issue_payload();
        payload["repository"]["full_name"] = json!("no-slash");
        let err = parse_issue_event(&payload).unwrap_err();
        assert!(matches!(err, ParseError::InvalidRepo(_)));
    }

    #[test]
    fn parses_merged_pull_request() {
        let event = parse_pull_request_event(&merged_payload()).unwrap();
        let pr = event.pull_request;
        assert_eq!(pr.number, PrNumber(15));
        assert!(pr.merged);
        assert!(pr.merged_at.is_some());
        assert_eq!(pr.head_ref.as_deref(), Some("feat/auth"));
        assert_eq!(pr.author_login.as_deref(), Some("octocat"));
    }

    #[test]
    fn optional_pull_request_fields_may_be_missing() {
        let mut payload = merged_payload();
        payload["pull_request"]["body"] = Value::Null;
        payload["pull_request"]["html_url"] = Value::Null;
        payload["pull_request"]["merged_at"] = Value::Null;
        payload["pull_request"]["head"] = json!({});
        payload["pull_request"]["user"] = json!({});

        let pr = parse_pull_request_event(&payload).unwrap().pull_request;
        assert_eq!(pr.body, None);
        assert_eq!(pr.html_url, None);
        assert_eq!(pr.head_ref, None);
        assert_eq!(pr.author_login, None);
    }

    #[test]
    fn missing_pull_request_is_reported() {
        let payload = json!({ "action": "closed", "repository": { "full_name": "a/b" } });
        let err = parse_pull_request_event(&payload).unwrap_err();
        assert!(matches!(err, ParseError::MissingField("pull_request")));
    }
}
