//! Intake gateway: turns an inbound participant message into either a
//! registration (first contact) or a proposal.

use storyloom_core::error::DomainError;
use tracing::{info, instrument};

use crate::application::session::Session;
use crate::domain::commands::ReceiveMessage;

/// What the gateway did with a message, plus the texts to send back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeReply {
    /// `true` when the sender was registered by this message.
    pub joined: bool,
    /// Reply texts, in order.
    pub messages: Vec<String>,
}

/// Handles the `ReceiveMessage` command.
///
/// An unknown sender is registered, using the message body as display name,
/// and gets the welcome banner followed by the whole story so far. The body
/// is not treated as a proposal. A known sender's body is submitted to the
/// current round; the reply is the acknowledgment whether or not the
/// proposal was accepted.
///
/// # Errors
///
/// Returns `DomainError::NotSeeded` before the session is initialized, or a
/// store error.
#[instrument(skip(session, command), fields(correlation_id = %command.correlation_id))]
pub async fn handle_receive_message(
    command: &ReceiveMessage,
    session: &Session,
) -> Result<IntakeReply, DomainError> {
    if session.current_round().await.is_none() {
        return Err(DomainError::NotSeeded);
    }
    let ports = session.ports();
    let settings = session.settings();
    let identity = command.identity.trim();
    if identity.is_empty() {
        return Err(DomainError::Validation("sender identity is empty".into()));
    }
    let body = command.body.trim();

    let display_name = if body.is_empty() { identity } else { body };
    let joined = ports
        .participants
        .register_if_absent(identity, display_name, ports.clock.now())
        .await?;

    if joined {
        info!(identity, display_name, "participant joined");
        let history = ports.history.read_all().await?;
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(settings.welcome_text.clone());
        messages.extend(history.into_iter().map(|entry| entry.text));
        return Ok(IntakeReply { joined, messages });
    }

    if !body.is_empty() {
        session.submit(identity, body).await?;
    }
    Ok(IntakeReply {
        joined,
        messages: vec![settings.ack_text.clone()],
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use storyloom_core::repository::{HistoryStore, ParticipantRegistry, ProposalStore};
    use storyloom_store::MemorySessionStore;
    use storyloom_test_support::{FixedClock, RecordingSender, ScriptedCompletion, TableEmbeddings};

    use super::*;
    use crate::application::session::{SessionPorts, SessionSettings};
    use crate::domain::messages::{DEFAULT_ACK_TEXT, DEFAULT_WELCOME_TEXT};

    async fn seeded() -> (Arc<MemorySessionStore>, Session) {
        let store = Arc::new(MemorySessionStore::new());
        let ports = SessionPorts {
            history: store.clone(),
            participants: store.clone(),
            proposals: store.clone(),
            completion: Arc::new(ScriptedCompletion::new(["You wake up in a cave."])),
            embeddings: Arc::new(TableEmbeddings::default()),
            sender: Arc::new(RecordingSender::new()),
            clock: Arc::new(FixedClock::standard()),
        };
        let session = Session::new(ports, SessionSettings::default());
        session.initialize("A cave adventure.").await.unwrap();
        (store, session)
    }

    #[tokio::test]
    async fn test_first_contact_registers_and_replays_story() {
        // Arrange
        let (store, session) = seeded().await;
        let command = ReceiveMessage::new("+15550001", "  Ada ");

        // Act
        let reply = handle_receive_message(&command, &session).await.unwrap();

        // Assert
        assert!(reply.joined);
        assert_eq!(
            reply.messages,
            vec![
                DEFAULT_WELCOME_TEXT.to_owned(),
                "You wake up in a cave.".to_owned()
            ]
        );
        let participant = store.find("+15550001").await.unwrap().unwrap();
        assert_eq!(participant.display_name, "Ada");
        assert!(store.load_round(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_first_message_uses_identity_as_name() {
        let (store, session) = seeded().await;

        handle_receive_message(&ReceiveMessage::new("+15550001", "   "), &session)
            .await
            .unwrap();

        let participant = store.find("+15550001").await.unwrap().unwrap();
        assert_eq!(participant.display_name, "+15550001");
    }

    #[tokio::test]
    async fn test_known_sender_submits_proposal_and_gets_ack() {
        // Arrange
        let (store, session) = seeded().await;
        handle_receive_message(&ReceiveMessage::new("+15550001", "Ada"), &session)
            .await
            .unwrap();

        // Act
        let reply = handle_receive_message(&ReceiveMessage::new("+15550001", "light a torch"), &session)
            .await
            .unwrap();

        // Assert
        assert!(!reply.joined);
        assert_eq!(reply.messages, vec![DEFAULT_ACK_TEXT.to_owned()]);
        let proposals = store.load_round(0).await.unwrap();
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].text, "light a torch");
    }

    #[tokio::test]
    async fn test_duplicate_proposal_gets_same_ack() {
        // Arrange
        let (store, session) = seeded().await;
        handle_receive_message(&ReceiveMessage::new("+1", "Ada"), &session)
            .await
            .unwrap();
        handle_receive_message(&ReceiveMessage::new("+1", "first"), &session)
            .await
            .unwrap();

        // Act
        let reply = handle_receive_message(&ReceiveMessage::new("+1", "second"), &session)
            .await
            .unwrap();

        // Assert
        assert_eq!(reply.messages, vec![DEFAULT_ACK_TEXT.to_owned()]);
        let proposals = store.load_round(0).await.unwrap();
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].text, "first");
    }

    #[tokio::test]
    async fn test_blank_proposal_is_acknowledged_but_not_stored() {
        let (store, session) = seeded().await;
        handle_receive_message(&ReceiveMessage::new("+1", "Ada"), &session)
            .await
            .unwrap();

        let reply = handle_receive_message(&ReceiveMessage::new("+1", " "), &session)
            .await
            .unwrap();

        assert_eq!(reply.messages, vec![DEFAULT_ACK_TEXT.to_owned()]);
        assert!(store.load_round(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_message_before_seed_is_rejected() {
        // Arrange
        let store = Arc::new(MemorySessionStore::new());
        let ports = SessionPorts {
            history: store.clone(),
            participants: store.clone(),
            proposals: store.clone(),
            completion: Arc::new(ScriptedCompletion::new(Vec::<String>::new())),
            embeddings: Arc::new(TableEmbeddings::default()),
            sender: Arc::new(RecordingSender::new()),
            clock: Arc::new(FixedClock::standard()),
        };
        let session = Session::new(ports, SessionSettings::default());

        // Act
        let result = handle_receive_message(&ReceiveMessage::new("+1", "hi"), &session).await;

        // Assert
        assert!(matches!(result, Err(DomainError::NotSeeded)));
        assert!(store.list_all().await.unwrap().is_empty());
        assert!(store.read_all().await.unwrap().is_empty());
    }
}
