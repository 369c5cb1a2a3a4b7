//! Environment configuration.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `GITHUB_TOKEN` | required |
//! | `OLLAMA_URL` | `http://localhost:11434/v1` |
//! | `OLLAMA_MODEL` | `deepseek-coder:6.7b` |
//! | `OPENROUTER_URL` | `https://openrouter.ai/api/v1` |
//! | `OPENROUTER_API_KEY` | unset |
//! | `FIX_MODEL` | `deepseek/deepseek-chat-v3-0324` |
//! | `LLM_TIMEOUT_SECS` | `120` |
//! | `KNOW_BIN` | `know` |
//! | `TRIAGE_MAX_MESSAGES` | unset (run until the transport closes) |
//!
//! Empty values are treated as unset.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/v1";
const DEFAULT_OLLAMA_MODEL: &str = "deepseek-coder:6.7b";
const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_FIX_MODEL: &str = "deepseek/deepseek-chat-v3-0324";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_KNOW_BIN: &str = "know";

/// Errors from reading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has invalid value {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Where a model is served and which model to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEndpoint {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

/// Process configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub github_token: String,

    /// Model used for triage plans and PR summaries.
    pub triage_model: ModelEndpoint,

    /// Model used for file selection and fix generation.
    pub fix_model: ModelEndpoint,

    /// Time budget for one outbound call (GitHub or model).
    pub call_timeout: Duration,

    /// The knowledge tool executable.
    pub know_bin: String,

    pub max_messages: Option<u64>,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let or = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        let github_token = get("GITHUB_TOKEN").ok_or(ConfigError::Missing("GITHUB_TOKEN"))?;
        let timeout_secs = parse_optional::<u64>("LLM_TIMEOUT_SECS", get("LLM_TIMEOUT_SECS"))?
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let max_messages =
            parse_optional::<u64>("TRIAGE_MAX_MESSAGES", get("TRIAGE_MAX_MESSAGES"))?;

        Ok(AppConfig {
            github_token,
            triage_model: ModelEndpoint {
                base_url: or("OLLAMA_URL", DEFAULT_OLLAMA_URL),
                api_key: None,
                model: or("OLLAMA_MODEL", DEFAULT_OLLAMA_MODEL),
            },
            fix_model: ModelEndpoint {
                base_url: or("OPENROUTER_URL", DEFAULT_OPENROUTER_URL),
                api_key: get("OPENROUTER_API_KEY"),
                model: or("FIX_MODEL", DEFAULT_FIX_MODEL),
            },
            call_timeout: Duration::from_secs(timeout_secs),
            know_bin: or("KNOW_BIN", DEFAULT_KNOW_BIN),
            max_messages,
        })
    }
}

fn parse_optional<T: FromStr>(
    name: &'static str,
    value: Option<String>,
) -> Result<Option<T>, ConfigError> {
    value
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidValue { name, value: v })
        })
        .transpose()
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("triage_model", &self.triage_model.model)
            .field("fix_model", &self.fix_model.model)
            .field("call_timeout", &self.call_timeout)
            .field("know_bin", &self.know_bin)
            .field("max_messages", &self.max_messages)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let cfg = config(&[("GITHUB_TOKEN", "ghp_x")]).unwrap();
        assert_eq!(cfg.github_token, "ghp_x");
        assert_eq!(cfg.triage_model.model, "deepseek-coder:6.7b");
        assert_eq!(cfg.fix_model.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(cfg.fix_model.model, "deepseek/deepseek-chat-v3-0324");
        assert_eq!(cfg.fix_model.api_key, None);
        assert_eq!(cfg.call_timeout, Duration::from_secs(120));
        assert_eq!(cfg.know_bin, "know");
        assert_eq!(cfg.max_messages, None);
    }

    #[test]
    fn token_is_required() {
        assert_eq!(config(&[]), Err(ConfigError::Missing("GITHUB_TOKEN")));
        assert_eq!(
            config(&[("GITHUB_TOKEN", "  ")]),
            Err(ConfigError::Missing("GITHUB_TOKEN"))
        );
    }

    #[test]
    fn overrides_are_read() {
        let cfg = config(&[
            ("GITHUB_TOKEN", "t"),
            ("OLLAMA_URL", "http://gpu:11434/v1"),
            ("OPENROUTER_API_KEY", "sk-or"),
            ("FIX_MODEL", "anthropic/claude"),
            ("LLM_TIMEOUT_SECS", "30"),
            ("TRIAGE_MAX_MESSAGES", "5"),
        ])
        .unwrap();
        assert_eq!(cfg.triage_model.base_url, "http://gpu:11434/v1");
        assert_eq!(cfg.fix_model.api_key.as_deref(), Some("sk-or"));
        assert_eq!(cfg.fix_model.model, "anthropic/claude");
        assert_eq!(cfg.call_timeout, Duration::from_secs(30));
        assert_eq!(cfg.max_messages, Some(5));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = config(&[("GITHUB_TOKEN", "t"), ("LLM_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                name: "LLM_TIMEOUT_SECS",
                value: "soon".into()
            }
        );
    }

    #[test]
    fn debug_hides_secrets() {
        let cfg = config(&[
            ("GITHUB_TOKEN", "ghp_secret"),
            ("OPENROUTER_API_KEY", "sk-secret"),
        ])
        .unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("ghp_secret"));
        assert!(!rendered.contains("sk-secret"));
    }
}
