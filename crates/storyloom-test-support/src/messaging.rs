//! Test senders — mock `MessageSender` implementations for tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use storyloom_core::error::DomainError;
use storyloom_core::services::MessageSender;

/// A sender that records every delivered `(recipient, body)` pair. Recipients
/// listed with [`RecordingSender::failing_for`] are rejected instead.
#[derive(Debug, Default)]
pub struct RecordingSender {
    unreachable: HashSet<String>,
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSender {
    /// Create a sender that delivers to everyone.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sends to `recipients` fail.
    #[must_use]
    pub fn failing_for<I, S>(mut self, recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unreachable = recipients.into_iter().map(Into::into).collect();
        self
    }

    /// Returns a snapshot of all delivered messages.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, recipient: &str, body: &str) -> Result<(), DomainError> {
        if self.unreachable.contains(recipient) {
            return Err(DomainError::Upstream(format!("{recipient} is unreachable")));
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_owned(), body.to_owned()));
        Ok(())
    }
}

/// A sender that rejects every message.
#[derive(Debug)]
pub struct FailingSender;

#[async_trait]
impl MessageSender for FailingSender {
    async fn send(&self, recipient: &str, _body: &str) -> Result<(), DomainError> {
        Err(DomainError::Upstream(format!("{recipient} is unreachable")))
    }
}
