//! Ports for the external collaborators: the generative model, the
//! embedding model, and outbound messaging.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Scenario text and proposals.
    User,
    /// Narration produced by the model.
    Assistant,
}

/// A role-tagged message sent to the generative model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who is speaking.
    pub role: ChatRole,
    /// Message body.
    pub content: String,
}

impl ChatMessage {
    /// A `user` message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// An `assistant` message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Continues a conversation with one generated reply.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Returns the model's continuation of `messages`.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, DomainError>;
}

/// Maps text to a fixed-length vector.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Returns the embedding of `text`.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError>;
}

/// Delivers a text message to one recipient.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Sends `body` to `recipient`.
    async fn send(&self, recipient: &str, body: &str) -> Result<(), DomainError>;
}
