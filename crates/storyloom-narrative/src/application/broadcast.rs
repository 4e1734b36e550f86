//! Fan-out of one message to every registered participant.

use futures::future::join_all;
use serde::Serialize;
use storyloom_core::error::DomainError;
use storyloom_core::repository::ParticipantRegistry;
use storyloom_core::services::MessageSender;
use tracing::warn;

/// Delivery counts for one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    /// Recipients the message was handed to.
    pub delivered: usize,
    /// Recipients whose send failed.
    pub failed: usize,
}

/// Sends `message` to every registered participant concurrently.
///
/// A failed send is logged and counted but never aborts the others.
///
/// # Errors
///
/// Returns `DomainError` only if the participant list cannot be read.
pub async fn broadcast(
    participants: &dyn ParticipantRegistry,
    sender: &dyn MessageSender,
    message: &str,
) -> Result<BroadcastReport, DomainError> {
    let recipients = participants.list_all().await?;
    let results = join_all(recipients.iter().map(|p| sender.send(&p.identity, message))).await;

    let mut report = BroadcastReport::default();
    for (participant, result) in recipients.iter().zip(results) {
        match result {
            Ok(()) => report.delivered += 1,
            Err(err) => {
                warn!(recipient = %participant.identity, error = %err, "broadcast delivery failed");
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use storyloom_store::MemorySessionStore;
    use storyloom_test_support::{FailingSender, FixedClock, RecordingSender};

    use super::*;

    async fn registry(identities: &[&str]) -> MemorySessionStore {
        let store = MemorySessionStore::new();
        for identity in identities {
            store
                .register_if_absent(identity, identity, FixedClock::standard().0)
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone_in_join_order() {
        // Arrange
        let store = registry(&["+1", "+2", "+3"]).await;
        let sender = RecordingSender::new();

        // Act
        let report = broadcast(&store, &sender, "hello").await.unwrap();

        // Assert
        assert_eq!(report, BroadcastReport { delivered: 3, failed: 0 });
        let recipients: Vec<String> = sender.sent().into_iter().map(|(r, _)| r).collect();
        assert_eq!(recipients, vec!["+1", "+2", "+3"]);
    }

    #[tokio::test]
    async fn test_broadcast_skips_failed_recipients() {
        // Arrange
        let store = registry(&["+1", "+2", "+3"]).await;
        let sender = RecordingSender::new().failing_for(["+2"]);

        // Act
        let report = broadcast(&store, &sender, "hello").await.unwrap();

        // Assert
        assert_eq!(report, BroadcastReport { delivered: 2, failed: 1 });
        assert_eq!(sender.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_broadcast_with_no_participants_sends_nothing() {
        let store = registry(&[]).await;

        let report = broadcast(&store, &FailingSender, "hello").await.unwrap();

        assert_eq!(report, BroadcastReport::default());
    }
}
