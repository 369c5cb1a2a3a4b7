//! Octocrab client wrapper.
//!
//! This module provides `OctocrabClient`, which wraps an `Octocrab` instance
//! together with the time budget applied to every call. Unlike a repo-scoped
//! client, the repository travels with each effect.

use std::time::Duration;

use octocrab::Octocrab;

/// Default time budget for a single GitHub API call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// A GitHub API client.
#[derive(Clone)]
pub struct OctocrabClient {
    /// The underlying octocrab client.
    client: Octocrab,

    /// Time budget for one API call.
    timeout: Duration,
}

impl OctocrabClient {
    /// Creates a new client with the default call timeout.
    pub fn new(client: Octocrab) -> Self {
        Self {
            client,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Creates a client authenticated with a bearer token.
    pub fn from_token(token: impl Into<String>) -> Result<Self, octocrab::Error> {
        let client = Octocrab::builder().personal_token(token.into()).build()?;
        Ok(Self::new(client))
    }

    /// Sets the time budget applied to each API call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns a reference to the underlying octocrab client.
    pub fn inner(&self) -> &Octocrab {
        &self.client
    }

    /// Returns the per-call time budget.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl std::fmt::Debug for OctocrabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OctocrabClient")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
