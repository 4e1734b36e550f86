//! Test model services — scripted `CompletionService` and
//! `EmbeddingService` implementations.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use storyloom_core::error::DomainError;
use storyloom_core::services::{ChatMessage, CompletionService, EmbeddingService};
use tokio::sync::{Notify, Semaphore};

/// A completion service that replays a fixed script. Each call consumes the
/// next step; `Err` steps surface as `DomainError::Upstream`. Every request
/// is recorded.
#[derive(Debug, Default)]
pub struct ScriptedCompletion {
    steps: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedCompletion {
    /// Create a script that answers with `replies` in order.
    #[must_use]
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_steps(replies.into_iter().map(|r| Ok(r.into())))
    }

    /// Create a script from explicit success/failure steps.
    #[must_use]
    pub fn from_steps<I>(steps: I) -> Self
    where
        I: IntoIterator<Item = Result<String, String>>,
    {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Returns every message batch received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, DomainError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        match self.steps.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(DomainError::Upstream(message)),
            None => Err(DomainError::Upstream("completion script exhausted".into())),
        }
    }
}

/// A completion service that always fails.
#[derive(Debug)]
pub struct FailingCompletion;

#[async_trait]
impl CompletionService for FailingCompletion {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, DomainError> {
        Err(DomainError::Upstream("model unavailable".into()))
    }
}

/// A completion service that blocks every call until the test releases it.
/// Useful for observing the engine while a round is mid-closing.
#[derive(Debug)]
pub struct GatedCompletion {
    reply: String,
    started: Notify,
    gate: Semaphore,
}

impl GatedCompletion {
    /// Create a gate that answers with `reply` once released.
    #[must_use]
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            started: Notify::new(),
            gate: Semaphore::new(0),
        }
    }

    /// Waits until a call has entered `complete`.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    /// Lets one blocked call return.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl CompletionService for GatedCompletion {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, DomainError> {
        self.started.notify_one();
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| DomainError::Upstream(format!("gate closed: {e}")))?;
        permit.forget();
        Ok(self.reply.clone())
    }
}

/// An embedding service backed by a lookup table. Unknown texts fail with
/// `DomainError::Upstream`. Counts calls per text.
#[derive(Debug, Default)]
pub struct TableEmbeddings {
    table: HashMap<String, Vec<f32>>,
    calls: Mutex<Vec<String>>,
}

impl TableEmbeddings {
    /// Create a table from `(text, vector)` pairs.
    #[must_use]
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: Into<String>,
    {
        Self {
            table: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Returns the texts embedded so far, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingService for TableEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        self.calls.lock().unwrap().push(text.to_owned());
        self.table
            .get(text)
            .cloned()
            .ok_or_else(|| DomainError::Upstream(format!("no embedding for {text:?}")))
    }
}

/// An embedding service that always fails.
#[derive(Debug)]
pub struct FailingEmbeddings;

#[async_trait]
impl EmbeddingService for FailingEmbeddings {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, DomainError> {
        Err(DomainError::Upstream("embedding endpoint unreachable".into()))
    }
}
