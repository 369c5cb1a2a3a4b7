//! Shared test doubles.
//!
//! Every seam the crate exposes (the delay, the GitHub interpreter, the model,
//! the knowledge recorder, the envelope source) has a scripted stand-in here.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::delay::Delay;
use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse};
use crate::github::GitHubApiError;
use crate::knowledge::{KnowledgeEntry, KnowledgeError, KnowledgeRecorder};
use crate::listener::{EnvelopeSource, TransportError};
use crate::llm::{LanguageModel, LlmError, ResultSchema};

// ─── Delay ───

/// A delay that returns immediately and remembers what it was asked to wait.
#[derive(Debug, Clone, Default)]
pub struct RecordingDelay {
    recorded: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delay(&self) -> Delay {
        let recorded = self.recorded.clone();
        Delay::from_fn(move |duration| {
            recorded.lock().unwrap().push(duration);
            Box::pin(std::future::ready(()))
        })
    }

    pub fn recorded(&self) -> Vec<Duration> {
        self.recorded.lock().unwrap().clone()
    }
}

// ─── GitHub ───

type Script = Box<dyn FnMut(&GitHubEffect) -> Result<GitHubResponse, GitHubApiError> + Send>;

/// A GitHub interpreter driven by a closure. Records every effect it sees.
pub struct MockGitHub {
    script: Mutex<Script>,
    calls: Mutex<Vec<GitHubEffect>>,
}

impl MockGitHub {
    pub fn new<F>(script: F) -> Self
    where
        F: FnMut(&GitHubEffect) -> Result<GitHubResponse, GitHubApiError> + Send + 'static,
    {
        Self {
            script: Mutex::new(Box::new(script)),
            calls: Mutex::default(),
        }
    }

    /// Records `effect` and answers it from the script.
    pub fn respond(&self, effect: &GitHubEffect) -> Result<GitHubResponse, GitHubApiError> {
        self.calls.lock().unwrap().push(effect.clone());
        let mut script = self.script.lock().unwrap();
        (*script)(effect)
    }

    pub fn calls(&self) -> Vec<GitHubEffect> {
        self.calls.lock().unwrap().clone()
    }
}

impl GitHubInterpreter for MockGitHub {
    async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, GitHubApiError> {
        self.respond(&effect)
    }
}

/// A 500 from GitHub.
pub fn server_error() -> GitHubApiError {
    GitHubApiError::from_status(500, "Server Error")
}

// ─── Model ───

/// A model answering from queues. An empty queue answers with an error.
#[derive(Debug, Default)]
pub struct MockModel {
    text: Mutex<VecDeque<Result<String, String>>>,
    structured: Mutex<VecDeque<Result<Value, String>>>,
    systems: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl MockModel {
    pub fn with_text<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        let model = Self::default();
        for reply in replies {
            model.push_text(reply);
        }
        model
    }

    pub fn push_text(&self, reply: impl Into<String>) {
        self.text.lock().unwrap().push_back(Ok(reply.into()));
    }

    pub fn push_text_error(&self, message: impl Into<String>) {
        self.text.lock().unwrap().push_back(Err(message.into()));
    }

    pub fn push_structured(&self, value: Value) {
        self.structured.lock().unwrap().push_back(Ok(value));
    }

    pub fn push_structured_error(&self, message: impl Into<String>) {
        self.structured.lock().unwrap().push_back(Err(message.into()));
    }

    /// System prompts of every call, text and structured, in call order.
    pub fn systems(&self) -> Vec<String> {
        self.systems.lock().unwrap().clone()
    }

    /// User prompts of every call, text and structured, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn record(&self, system: &str, prompt: &str) {
        self.systems.lock().unwrap().push(system.to_string());
        self.prompts.lock().unwrap().push(prompt.to_string());
    }
}

fn scripted_error(message: String) -> LlmError {
    LlmError::Api {
        status: 500,
        message,
    }
}

impl LanguageModel for MockModel {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        self.record(system, prompt);
        match self.text.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(scripted_error(message)),
            None => Err(LlmError::EmptyResponse),
        }
    }

    async fn complete_structured(
        &self,
        system: &str,
        prompt: &str,
        _schema: &ResultSchema,
    ) -> Result<Value, LlmError> {
        self.record(system, prompt);
        match self.structured.lock().unwrap().pop_front() {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(scripted_error(message)),
            None => Err(LlmError::EmptyResponse),
        }
    }
}

// ─── Knowledge ───

/// Remembers every entry; optionally fails after remembering.
#[derive(Debug, Default)]
pub struct RecordingRecorder {
    entries: Mutex<Vec<KnowledgeEntry>>,
    fail: bool,
}

impl RecordingRecorder {
    pub fn failing() -> Self {
        Self {
            entries: Mutex::default(),
            fail: true,
        }
    }

    pub fn entries(&self) -> Vec<KnowledgeEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl KnowledgeRecorder for RecordingRecorder {
    async fn record(&self, entry: &KnowledgeEntry) -> Result<(), KnowledgeError> {
        self.entries.lock().unwrap().push(entry.clone());
        if self.fail {
            return Err(KnowledgeError::Spawn {
                program: "know".into(),
                source: std::io::Error::other("Database connection failed"),
            });
        }
        Ok(())
    }
}

// ─── Transport ───

/// An envelope source fed through a channel. Dropping the sender closes it.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<Result<String, TransportError>>,
    reconnects: u32,
}

impl ChannelSource {
    pub fn new() -> (mpsc::UnboundedSender<Result<String, TransportError>>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx, reconnects: 0 })
    }

    pub fn reconnects(&self) -> u32 {
        self.reconnects
    }
}

impl EnvelopeSource for ChannelSource {
    async fn next_message(&mut self) -> Result<Option<String>, TransportError> {
        match self.rx.recv().await {
            Some(Ok(message)) => Ok(Some(message)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    async fn reconnect(&mut self) -> Result<(), TransportError> {
        self.reconnects += 1;
        Ok(())
    }
}
