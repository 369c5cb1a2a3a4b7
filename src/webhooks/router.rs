//! Event routing.
//!
//! Routing is a table lookup keyed by `(eventType, action)`, with a guard for
//! the rows that also depend on the payload (merged vs. unmerged pull
//! requests). Adding an event combination means adding a row to [`ROUTES`].
//!
//! | eventType | action | guard | handler |
//! |-----------|--------|-------|---------|
//! | `issues` | `opened` | - | [`Handler::TriageIssue`] |
//! | `issues` | `labeled` | - | [`Handler::RetriageLabeledIssue`] |
//! | `pull_request` | `opened` | - | [`Handler::SummarizePullRequest`] |
//! | `pull_request` | `closed` | merged | [`Handler::RecordMergedPullRequest`] |
//! | `pull_request` | `closed` | not merged | [`Handler::SkipUnmergedPullRequest`] |

use std::fmt;

use super::envelope::EventEnvelope;

/// A unit of handling logic bound to one routing table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handler {
    /// Generate a triage plan for a new issue and comment it.
    TriageIssue,
    /// Re-triage an issue using the applied label as extra context.
    RetriageLabeledIssue,
    /// Summarize a newly opened pull request and comment it.
    SummarizePullRequest,
    /// Record a merged pull request in the knowledge base.
    RecordMergedPullRequest,
    /// A pull request closed without merging. Deliberately does nothing.
    SkipUnmergedPullRequest,
}

impl Handler {
    pub fn name(&self) -> &'static str {
        match self {
            Handler::TriageIssue => "triage_issue",
            Handler::RetriageLabeledIssue => "retriage_labeled_issue",
            Handler::SummarizePullRequest => "summarize_pull_request",
            Handler::RecordMergedPullRequest => "record_merged_pull_request",
            Handler::SkipUnmergedPullRequest => "skip_unmerged_pull_request",
        }
    }
}

impl fmt::Display for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A payload predicate a row needs in addition to its `(eventType, action)` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Always,
    Merged,
    NotMerged,
}

impl Guard {
    fn admits(self, envelope: &EventEnvelope) -> bool {
        match self {
            Guard::Always => true,
            Guard::Merged => envelope.is_merged_pull_request(),
            Guard::NotMerged => !envelope.is_merged_pull_request(),
        }
    }
}

/// One row of the routing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub event_type: &'static str,
    pub action: &'static str,
    pub guard: Guard,
    pub handler: Handler,
}

/// The routing table. Rows sharing a key must have mutually exclusive guards.
pub const ROUTES: &[Route] = &[
    Route {
        event_type: "issues",
        action: "opened",
        guard: Guard::Always,
        handler: Handler::TriageIssue,
    },
    Route {
        event_type: "issues",
        action: "labeled",
        guard: Guard::Always,
        handler: Handler::RetriageLabeledIssue,
    },
    Route {
        event_type: "pull_request",
        action: "opened",
        guard: Guard::Always,
        handler: Handler::SummarizePullRequest,
    },
    Route {
        event_type: "pull_request",
        action: "closed",
        guard: Guard::Merged,
        handler: Handler::RecordMergedPullRequest,
    },
    Route {
        event_type: "pull_request",
        action: "closed",
        guard: Guard::NotMerged,
        handler: Handler::SkipUnmergedPullRequest,
    },
];

fn rows_for<'a>(envelope: &'a EventEnvelope) -> impl Iterator<Item = &'static Route> + 'a {
    let action = envelope.action();
    ROUTES
        .iter()
        .filter(move |r| r.event_type == envelope.event_type && Some(r.action) == action)
}

/// Returns whether the envelope names a combination the table knows about.
///
/// `false` for an absent envelope, an unknown event type, or an action with
/// no row. Never fails.
pub fn should_process(envelope: Option<&EventEnvelope>) -> bool {
    envelope.is_some_and(|e| rows_for(e).next().is_some())
}

/// Resolves the handler for an envelope, or `None` if nothing is bound to it.
pub fn resolve_handler(envelope: &EventEnvelope) -> Option<Handler> {
    rows_for(envelope)
        .find(|r| r.guard.admits(envelope))
        .map(|r| r.handler)
}
