//! Fire-and-forget side actions.
//!
//! Posting a status comment or recording knowledge must never replace the
//! result the caller is actually reporting. [`best_effort`] awaits the action,
//! logs a failure, and hands back `None` instead of an error.

use std::fmt;
use std::future::Future;

use tracing::warn;

/// Runs a side action whose failure is logged and discarded.
pub async fn best_effort<T, E, Fut>(action: &str, fut: Fut) -> Option<T>
where
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(action, error = %e, "Best-effort action failed; ignoring");
            None
        }
    }
}
