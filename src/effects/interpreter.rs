//! Effect interpreter trait.
//!
//! The trait-based design enables:
//! - Scripted interpreters for testing
//! - The octocrab-backed interpreter in [`crate::github`]

use std::future::Future;
use std::sync::Arc;

use crate::github::GitHubApiError;

use super::github::{GitHubEffect, GitHubResponse};

/// Interprets GitHub effects against the GitHub API.
///
/// An interpreter executes exactly one API call per effect and never retries;
/// retry belongs to the gateway's executor.
///
/// # Example (mock for testing)
///
/// ```ignore
/// struct MockGitHubInterpreter {
///     responses: HashMap<GitHubEffect, GitHubResponse>,
/// }
///
/// impl GitHubInterpreter for MockGitHubInterpreter {
///     async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, GitHubApiError> {
///         self.responses.get(&effect)
///             .cloned()
///             .ok_or_else(|| GitHubApiError::permanent_without_source("unexpected effect"))
///     }
/// }
/// ```
pub trait GitHubInterpreter {
    /// Execute a GitHub effect and return its response.
    fn interpret(
        &self,
        effect: GitHubEffect,
    ) -> impl Future<Output = Result<GitHubResponse, GitHubApiError>> + Send;
}

impl<T> GitHubInterpreter for Arc<T>
where
    T: GitHubInterpreter + Send + Sync,
{
    fn interpret(
        &self,
        effect: GitHubEffect,
    ) -> impl Future<Output = Result<GitHubResponse, GitHubApiError>> + Send {
        (**self).interpret(effect)
    }
}
