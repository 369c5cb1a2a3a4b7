//! GitHub API error types.
//!
//! A single failed call is a [`GitHubApiError`], categorized as:
//!
//! - **Transient** errors (5xx, rate limits, timeouts, network failures)
//! - **Permanent** errors (most 4xx: validation, not found, conflicts)
//!
//! The category is recorded for logs and callers; the gateway's executor
//! retries both kinds identically. A call that failed on every attempt
//! surfaces as [`GatewayError::Exhausted`].

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::effects::GitHubResponse;
use crate::retry::ExhaustedRetries;

/// The kind of GitHub API error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubErrorKind {
    /// Transient error - likely to succeed on a later attempt.
    ///
    /// Examples:
    /// - HTTP 5xx (server errors)
    /// - HTTP 429 (rate limited)
    /// - HTTP 403 with rate limit message
    /// - Network failures and timeouts
    Transient,

    /// Permanent error - a later attempt with the same input fails the same way.
    ///
    /// Examples:
    /// - HTTP 404 (issue, branch or file not found)
    /// - HTTP 409 (file updated without its current SHA)
    /// - HTTP 422 (branch already exists, validation failed)
    /// - Authentication failures (401, 403 non-rate-limit)
    Permanent,
}

impl GitHubErrorKind {
    /// Returns true if this error is likely to resolve on its own.
    pub fn is_transient(&self) -> bool {
        matches!(self, GitHubErrorKind::Transient)
    }
}

impl fmt::Display for GitHubErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitHubErrorKind::Transient => write!(f, "transient"),
            GitHubErrorKind::Permanent => write!(f, "permanent"),
        }
    }
}

/// A failed GitHub API call.
#[derive(Debug, Error)]
pub struct GitHubApiError {
    /// The kind of error (transient or permanent).
    pub kind: GitHubErrorKind,

    /// The HTTP status code, if available.
    pub status_code: Option<u16>,

    /// A human-readable description of the error.
    pub message: String,

    /// The underlying octocrab error, if available.
    #[source]
    pub source: Option<octocrab::Error>,
}

impl fmt::Display for GitHubApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "GitHub API error (HTTP {}): {}", code, self.message),
            None => write!(f, "GitHub API error: {}", self.message),
        }
    }
}

impl GitHubApiError {
    /// Creates a permanent error without an octocrab source.
    pub fn permanent_without_source(message: impl Into<String>) -> Self {
        Self {
            kind: GitHubErrorKind::Permanent,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transient error without an octocrab source.
    pub fn transient_without_source(message: impl Into<String>) -> Self {
        Self {
            kind: GitHubErrorKind::Transient,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error with a known HTTP status, categorized by that status.
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: kind_for_status(status_code, &message),
            status_code: Some(status_code),
            message,
            source: None,
        }
    }

    /// Creates the error reported when a call exceeds its time budget.
    pub fn timeout(operation: &str, budget: Duration) -> Self {
        Self::transient_without_source(format!(
            "{} timed out after {}s",
            operation,
            budget.as_secs()
        ))
    }

    /// Creates the error reported when a response does not have the expected shape.
    pub fn unexpected_response(operation: &str, response: &GitHubResponse) -> Self {
        Self::permanent_without_source(format!(
            "unexpected {} response to {}",
            response.name(),
            operation
        ))
    }

    /// Categorizes an octocrab error.
    ///
    /// The categorization is based on:
    /// - HTTP status codes
    /// - Error message patterns for known GitHub API responses
    pub fn from_octocrab(err: octocrab::Error) -> Self {
        let status_code = Self::extract_status_code(&err);
        let message = err.to_string();

        let kind = match status_code {
            Some(code) => kind_for_status(code, &message),
            None if is_network_error(&message) => GitHubErrorKind::Transient,
            None => GitHubErrorKind::Permanent,
        };

        Self {
            kind,
            status_code,
            message,
            source: Some(err),
        }
    }

    /// Extracts the HTTP status code from an octocrab error, if present.
    ///
    /// `octocrab::Error::GitHub` carries the status of the failed response;
    /// other variants (transport, JSON, URL) have none and fall back to
    /// message inspection.
    fn extract_status_code(err: &octocrab::Error) -> Option<u16> {
        if let octocrab::Error::GitHub { source, .. } = err {
            return Some(source.status_code.as_u16());
        }

        let err_str = err.to_string();
        if let Some(idx) = err_str.find("status: ") {
            let digits: String = err_str[idx + 8..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if let Ok(code) = digits.parse() {
                return Some(code);
            }
        }

        None
    }
}

fn kind_for_status(code: u16, message: &str) -> GitHubErrorKind {
    match code {
        429 => GitHubErrorKind::Transient, // Rate limited
        403 if is_rate_limit_error(message) => GitHubErrorKind::Transient,
        500..=599 => GitHubErrorKind::Transient,
        _ if is_transient_message(message) => GitHubErrorKind::Transient,
        _ => GitHubErrorKind::Permanent,
    }
}

/// Checks if an error message asks the client to come back later.
fn is_transient_message(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("try again") || message_lower.contains("temporarily unavailable")
}

/// Checks if an error message indicates a rate limit.
fn is_rate_limit_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("rate limit")
        || message_lower.contains("api rate")
        || message_lower.contains("secondary rate")
        || message_lower.contains("abuse detection")
}

/// Checks if an error message indicates a network-level error.
fn is_network_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("timeout")
        || message_lower.contains("connection")
        || message_lower.contains("network")
        || message_lower.contains("dns")
        || message_lower.contains("timed out")
}

/// Errors returned by [`super::GitHubGateway`] operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Every attempt of the call failed; carries the last failure.
    #[error(transparent)]
    Exhausted(#[from] ExhaustedRetries<GitHubApiError>),

    /// The interpreter answered with a response for a different operation.
    #[error("unexpected {response} response to {operation}")]
    UnexpectedResponse {
        operation: &'static str,
        response: &'static str,
    },

    /// File content could not be decoded from base64.
    #[error("invalid base64 content for {path}: {source}")]
    InvalidContent {
        path: String,
        #[source]
        source: base64::DecodeError,
    },
}

impl GatewayError {
    pub(crate) fn unexpected(operation: &'static str, response: &GitHubResponse) -> Self {
        GatewayError::UnexpectedResponse {
            operation,
            response: response.name(),
        }
    }

    /// Returns the final API error if the call was attempted and failed.
    pub fn api_error(&self) -> Option<&GitHubApiError> {
        match self {
            GatewayError::Exhausted(e) => Some(&e.last_error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_are_categorized() {
        assert_eq!(
            GitHubApiError::from_status(500, "Server Error").kind,
            GitHubErrorKind::Transient
        );
        assert_eq!(
            GitHubApiError::from_status(429, "Too Many Requests").kind,
            GitHubErrorKind::Transient
        );
        assert_eq!(
            GitHubApiError::from_status(403, "API rate limit exceeded").kind,
            GitHubErrorKind::Transient
        );
        assert_eq!(
            GitHubApiError::from_status(403, "Resource not accessible").kind,
            GitHubErrorKind::Permanent
        );
        assert_eq!(
            GitHubApiError::from_status(422, "Reference already exists").kind,
            GitHubErrorKind::Permanent
        );
    }

    #[test]
    fn display_includes_status_when_known() {
        let err = GitHubApiError::from_status(404, "Not Found");
        assert_eq!(err.to_string(), "GitHub API error (HTTP 404): Not Found");

        let err = GitHubApiError::transient_without_source("connection reset");
        assert_eq!(err.to_string(), "GitHub API error: connection reset");
    }

    #[test]
    fn rate_limit_detection() {
        assert!(is_rate_limit_error("API rate limit exceeded"));
        assert!(is_rate_limit_error("secondary rate limit"));
        assert!(is_rate_limit_error("abuse detection mechanism"));
        assert!(!is_rate_limit_error("Permission denied"));
    }

    #[test]
    fn network_error_detection() {
        assert!(is_network_error("connection timeout"));
        assert!(is_network_error("DNS resolution failed"));
        assert!(is_network_error("request timed out"));
        assert!(!is_network_error("Not found"));
    }

    #[test]
    fn timeout_is_transient() {
        let err = GitHubApiError::timeout("get_issue", Duration::from_secs(120));
        assert!(err.kind.is_transient());
        assert!(err.message.contains("120s"));
    }
}
