//! Incoming GitHub events.
//!
//! This module provides:
//! - [`EventEnvelope`], the unit the transport delivers
//! - The routing table ([`resolve_handler`], [`should_process`])
//! - Typed payload parsing
//! - The triage handlers behind the [`EventDispatcher`] seam

pub mod envelope;
pub mod handlers;
pub mod parser;
pub mod router;

pub use envelope::EventEnvelope;
pub use handlers::{EventDispatcher, HandlerError, TriageHandlers};
pub use parser::{
    IssueEvent, ParseError, PullRequestEvent, parse_issue_event, parse_pull_request_event,
};
pub use router::{Guard, Handler, ROUTES, Route, resolve_handler, should_process};
