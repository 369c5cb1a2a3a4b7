//! The listener loop.
//!
//! The listener pulls raw messages from an [`EnvelopeSource`] one at a time,
//! parses each into an [`EventEnvelope`], routes it, and dispatches it. Every
//! message is processed to completion before the next is requested, so
//! handling order is delivery order.
//!
//! # Failure handling
//!
//! - Malformed messages are skipped
//! - Unroutable envelopes are skipped
//! - A handler error is logged as "Error processing event" and the loop continues
//! - A transport error triggers a reconnect after a backoff delay, awaited
//!   through the injected [`Delay`]
//!
//! # Termination
//!
//! - The transport closes (end of stream)
//! - `max_messages` messages have been received
//! - The shutdown token is cancelled

mod source;


use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::delay::Delay;
use crate::retry::RetryConfig;
use crate::webhooks::{EventDispatcher, EventEnvelope, resolve_handler, should_process};

pub use source::{EnvelopeSource, LineSource, TransportError};

/// Configuration for the listener loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListenerConfig {
    /// Stop after this many received messages. `None` runs until the
    /// transport closes or shutdown is requested.
    pub max_messages: Option<u64>,

    /// Backoff between reconnect attempts. Only the delay schedule is used.
    pub reconnect: RetryConfig,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            max_messages: None,
            reconnect: RetryConfig::RECONNECT,
        }
    }
}

/// Whether the loop is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Running,
    Stopped,
}

/// What happened during one run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerSummary {
    /// Raw messages received from the transport.
    pub received: u64,
    /// Envelopes handed to a handler, whether or not it succeeded.
    pub dispatched: u64,
    /// Well-formed envelopes the router does not handle.
    pub skipped: u64,
    /// Messages that were not valid envelopes.
    pub malformed: u64,
    /// Dispatched envelopes whose handler returned an error.
    pub failed: u64,
}

/// The long-running event consumer.
#[derive(Debug)]
pub struct Listener<S, D> {
    source: S,
    dispatcher: D,
    config: ListenerConfig,
    delay: Delay,
    state: ListenerState,
}

impl<S, D> Listener<S, D>
where
    S: EnvelopeSource,
    D: EventDispatcher,
{
    pub fn new(source: S, dispatcher: D, config: ListenerConfig, delay: Delay) -> Self {
        Self {
            source,
            dispatcher,
            config,
            delay,
            state: ListenerState::Stopped,
        }
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Runs the loop until the transport closes, the message bound is
    /// reached, or `shutdown` is cancelled.
    pub async fn run(&mut self, shutdown: CancellationToken) -> ListenerSummary {
        self.state = ListenerState::Running;
        info!(max_messages = ?self.config.max_messages, "Listener started");

        let mut summary = ListenerSummary::default();
        let mut consecutive_failures: u32 = 0;

        loop {
            if let Some(max) = self.config.max_messages
                && summary.received >= max
            {
                info!(max_messages = max, "Message bound reached");
                break;
            }

            let next = tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received, stopping listener");
                    break;
                }

                next = self.source.next_message() => next,
            };

            match next {
                Ok(Some(raw)) => {
                    consecutive_failures = 0;
                    summary.received += 1;
                    self.process(&raw, &mut summary).await;
                }
                Ok(None) => {
                    info!("Transport closed");
                    break;
                }
                Err(e) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    let delay = self.config.reconnect.delay_for_attempt(consecutive_failures);
                    warn!(
                        error = %e,
                        attempt = consecutive_failures,
                        delay_ms = delay.as_millis() as u64,
                        "Transport error, reconnecting"
                    );

                    tokio::select! {
                        biased;

                        _ = shutdown.cancelled() => {
                            info!("Shutdown signal received during reconnect backoff");
                            break;
                        }

                        _ = self.delay.wait(delay) => {}
                    }

                    if let Err(e) = self.source.reconnect().await {
                        warn!(error = %e, "Reconnect failed");
                    }
                }
            }
        }

        self.state = ListenerState::Stopped;
        info!(
            received = summary.received,
            dispatched = summary.dispatched,
            skipped = summary.skipped,
            malformed = summary.malformed,
            failed = summary.failed,
            "Listener stopped"
        );
        summary
    }

    async fn process(&self, raw: &str, summary: &mut ListenerSummary) {
        let envelope = match EventEnvelope::parse(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(error = %e, "Skipping malformed message");
                summary.malformed += 1;
                return;
            }
        };

        if !should_process(Some(&envelope)) {
            debug!(
                event_type = %envelope.event_type,
                action = ?envelope.action(),
                "Skipping unhandled event"
            );
            summary.skipped += 1;
            return;
        }
        let Some(handler) = resolve_handler(&envelope) else {
            summary.skipped += 1;
            return;
        };

        summary.dispatched += 1;
        if let Err(e) = self.dispatcher.dispatch(handler, &envelope).await {
            summary.failed += 1;
            error!(
                handler = %handler,
                event_type = %envelope.event_type,
                error = %e,
                "Error processing event"
            );
        }
    }
}
