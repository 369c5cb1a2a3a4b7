//! The injectable wait used between retries and before reconnecting.
//!
//! Everything that backs off takes a [`Delay`] at construction time instead of
//! calling `tokio::time::sleep` directly, so tests can record the requested
//! durations without waiting.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Boxed future returned by a delay function.
pub type DelayFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A replaceable "wait for this long" capability.
///
/// Cloning is cheap; clones share the same underlying function.
#[derive(Clone)]
pub struct Delay(Arc<dyn Fn(Duration) -> DelayFuture + Send + Sync>);

impl Delay {
    /// A delay backed by the tokio timer.
    pub fn tokio() -> Self {
        Delay::from_fn(|duration| Box::pin(tokio::time::sleep(duration)))
    }

    /// A delay that returns immediately.
    pub fn none() -> Self {
        Delay::from_fn(|_| Box::pin(std::future::ready(())))
    }

    /// Wraps an arbitrary delay function.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(Duration) -> DelayFuture + Send + Sync + 'static,
    {
        Delay(Arc::new(f))
    }

    /// Waits for `duration` using the configured function.
    pub async fn wait(&self, duration: Duration) {
        (self.0)(duration).await
    }
}

impl Default for Delay {
    fn default() -> Self {
        Self::tokio()
    }
}

impl fmt::Debug for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delay").finish_non_exhaustive()
    }
}
