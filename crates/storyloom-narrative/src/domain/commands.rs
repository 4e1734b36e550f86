//! Commands for the turn aggregation context.

use uuid::Uuid;

/// Command carrying one inbound participant message.
#[derive(Debug, Clone)]
pub struct ReceiveMessage {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Sender identity (for SMS, the phone number).
    pub identity: String,
    /// Free-text message body.
    pub body: String,
}

impl ReceiveMessage {
    /// Creates the command with a fresh correlation ID.
    #[must_use]
    pub fn new(identity: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            identity: identity.into(),
            body: body.into(),
        }
    }
}

/// Command to close the current round.
#[derive(Debug, Clone, Copy)]
pub struct CloseRound {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
}

impl CloseRound {
    /// Creates the command with a fresh correlation ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
        }
    }
}

impl Default for CloseRound {
    fn default() -> Self {
        Self::new()
    }
}
