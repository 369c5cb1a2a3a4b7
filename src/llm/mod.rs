//! The language-model collaborator.
//!
//! Two capabilities are needed: free-text completion (triage plans, PR
//! summaries, file selection) and structured completion against a JSON
//! schema (fix plans). Both are expressed by [`LanguageModel`] so handlers and
//! the fix pipeline can be driven by a scripted model in tests.

mod openai;

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

pub use openai::OpenAiCompatibleModel;

/// Errors from a single model call.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The request could not be sent or the response body could not be read.
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("LLM API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The endpoint answered without any content.
    #[error("LLM returned an empty response")]
    EmptyResponse,

    /// Structured output was not valid JSON.
    #[error("LLM returned invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// A named JSON schema the model's structured output must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSchema {
    pub name: String,
    pub description: String,
    pub schema: Value,
}

impl ResultSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
        }
    }
}

/// A chat model reachable over the network.
///
/// Implementations make exactly one request per call. Retrying is the
/// caller's decision.
pub trait LanguageModel {
    /// Completes `prompt` under `system` and returns the reply text.
    fn complete(
        &self,
        system: &str,
        prompt: &str,
    ) -> impl Future<Output = Result<String, LlmError>> + Send;

    /// Completes `prompt` under `system`, constraining the reply to `schema`.
    fn complete_structured(
        &self,
        system: &str,
        prompt: &str,
        schema: &ResultSchema,
    ) -> impl Future<Output = Result<Value, LlmError>> + Send;
}

impl<T> LanguageModel for Arc<T>
where
    T: LanguageModel + Send + Sync,
{
    fn complete(
        &self,
        system: &str,
        prompt: &str,
    ) -> impl Future<Output = Result<String, LlmError>> + Send {
        (**self).complete(system, prompt)
    }

    fn complete_structured(
        &self,
        system: &str,
        prompt: &str,
        schema: &ResultSchema,
    ) -> impl Future<Output = Result<Value, LlmError>> + Send {
        (**self).complete_structured(system, prompt, schema)
    }
}

/// Strips a surrounding markdown code fence (```` ```json ... ``` ````) if present.
///
/// Models asked for bare JSON still wrap it in a fence often enough that every
/// parser of model output goes through this first.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json", "JSON", ...) on the opening line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}
