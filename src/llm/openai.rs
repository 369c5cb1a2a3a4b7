//! OpenAI-compatible chat completion client.
//!
//! OpenRouter and Ollama both expose `/chat/completions`, so one client
//! serves the triage model and the fix model with different base URLs.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use super::{LanguageModel, LlmError, ResultSchema, strip_code_fence};

/// A model served behind an OpenAI-compatible HTTP API.
#[derive(Clone)]
pub struct OpenAiCompatibleModel {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiCompatibleModel {
    /// Creates a client for `model` at `base_url`, with `timeout` applied to every request.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            model: model.into(),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    fn build_request<'a>(
        &'a self,
        system: &'a str,
        prompt: &'a str,
        schema: Option<&ResultSchema>,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            response_format: schema.map(|s| {
                json!({
                    "type": "json_schema",
                    "json_schema": {
                        "name": s.name,
                        "description": s.description,
                        "schema": s.schema,
                        "strict": true,
                    }
                })
            }),
        }
    }

    async fn send(&self, request: &ChatRequest<'_>) -> Result<String, LlmError> {
        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        debug!(
            model = %self.model,
            structured = request.response_format.is_some(),
            "Sending chat completion"
        );
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

impl LanguageModel for OpenAiCompatibleModel {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let request = self.build_request(system, prompt, None);
        self.send(&request).await
    }

    async fn complete_structured(
        &self,
        system: &str,
        prompt: &str,
        schema: &ResultSchema,
    ) -> Result<Value, LlmError> {
        let request = self.build_request(system, prompt, Some(schema));
        let text = self.send(&request).await?;
        Ok(serde_json::from_str(strip_code_fence(&text))?)
    }
}

impl std::fmt::Debug for OpenAiCompatibleModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleModel")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> OpenAiCompatibleModel {
        OpenAiCompatibleModel::new(
            "https://openrouter.ai/api/v1/",
            Some("sk-test".into()),
            "deepseek/deepseek-chat-v3-0324",
            Duration::from_secs(120),
        )
        .unwrap()
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        assert_eq!(model().base_url, "https://openrouter.ai/api/v1");
    }

    #[test]
    fn empty_api_key_is_dropped() {
        let m = OpenAiCompatibleModel::new(
            "http://localhost:11434/v1",
            Some(String::new()),
            "deepseek-coder:6.7b",
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(m.api_key.is_none());
    }

    #[test]
    fn text_request_has_no_response_format() {
        let m = model();
        let request = serde_json::to_value(m.build_request("sys", "hello", None)).unwrap();
        assert_eq!(request["model"], "deepseek/deepseek-chat-v3-0324");
        assert_eq!(request["messages"][0]["role"], "system");
        assert_eq!(request["messages"][1]["content"], "hello");
        assert!(request.get("response_format").is_none());
    }

    #[test]
    fn structured_request_carries_schema() {
        let m = model();
        let schema = ResultSchema::new("fix", "A code fix", json!({"type": "object"}));
        let request = serde_json::to_value(m.build_request("sys", "go", Some(&schema))).unwrap();
        assert_eq!(request["response_format"]["type"], "json_schema");
        assert_eq!(request["response_format"]["json_schema"]["name"], "fix");
        assert_eq!(
            request["response_format"]["json_schema"]["schema"]["type"],
            "object"
        );
    }

    #[test]
    fn response_content_is_extracted() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"ok"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("ok"));
    }

    #[test]
    fn debug_redacts_key() {
        let rendered = format!("{:?}", model());
        assert!(!rendered.contains("sk-test"));
    }
}
