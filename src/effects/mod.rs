//! Effects-as-data for GitHub operations.
//!
//! This module defines effect types that describe operations without executing them.
//! This enables:
//! - Testability via scripted interpreters
//! - Logging/tracing of intended operations
//! - A single place (the gateway) that decides how calls are retried

pub mod github;
pub mod interpreter;

pub use github::{EncodedFile, GitHubEffect, GitHubResponse};
pub use interpreter::GitHubInterpreter;
