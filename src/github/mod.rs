//! GitHub API client, effect interpreter, and repository gateway.
//!
//! The interpreter executes one effect per API call via octocrab. The gateway
//! layers typed operations and the retrying executor on top of any
//! [`crate::effects::GitHubInterpreter`].
//!
//! Key features:
//! - Every gateway call runs under the executor (3 attempts, 1s then 2s)
//! - Per-call time budget enforced by the interpreter
//! - File contents travel base64-encoded and are decoded at the gateway

mod client;
mod error;
mod gateway;
mod interpreter;

pub use client::{DEFAULT_CALL_TIMEOUT, OctocrabClient};
pub use error::{GatewayError, GitHubApiError, GitHubErrorKind};
pub use gateway::{DEFAULT_BRANCH, GitHubGateway};
