//! Query handlers for the story session.
//!
//! Read-only views over the history log, the current round and the
//! participant registry.

use chrono::{DateTime, Utc};
use serde::Serialize;
use storyloom_core::error::DomainError;
use storyloom_core::history::{EntryRole, HistoryEntry};
use storyloom_core::participant::Participant;

use crate::application::session::Session;
use crate::domain::aggregates::RoundStatus;

/// Read-only view of one history entry.
#[derive(Debug, Serialize)]
pub struct HistoryEntryView {
    /// Position in the log.
    pub index: u64,
    /// Entry kind.
    pub role: EntryRole,
    /// Entry text.
    pub text: String,
}

impl From<HistoryEntry> for HistoryEntryView {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            index: entry.index,
            role: entry.role,
            text: entry.text,
        }
    }
}

/// Read-only view of the whole story.
#[derive(Debug, Serialize)]
pub struct HistoryView {
    /// The scenario the session was seeded from.
    pub scenario: String,
    /// Completed rounds.
    pub completed_rounds: u64,
    /// Every entry in order.
    pub entries: Vec<HistoryEntryView>,
}

/// Read-only view of the current round.
#[derive(Debug, Serialize)]
pub struct RoundView {
    /// Round number.
    pub number: u64,
    /// Lifecycle status.
    pub status: RoundStatus,
    /// When the round opened.
    pub opened_at: DateTime<Utc>,
    /// Proposals stored for this round so far.
    pub proposal_count: usize,
}

/// Read-only view of a participant.
#[derive(Debug, Serialize)]
pub struct ParticipantView {
    /// Participant identity.
    pub identity: String,
    /// Display name.
    pub display_name: String,
    /// First contact.
    pub joined_at: DateTime<Utc>,
}

impl From<Participant> for ParticipantView {
    fn from(participant: Participant) -> Self {
        Self {
            identity: participant.identity,
            display_name: participant.display_name,
            joined_at: participant.joined_at,
        }
    }
}

/// Retrieves the scenario and the full history log.
///
/// # Errors
///
/// Returns `DomainError::NotSeeded` if the session has no scenario yet.
pub async fn get_history(session: &Session) -> Result<HistoryView, DomainError> {
    let ports = session.ports();
    let scenario = ports.history.scenario().await?.ok_or(DomainError::NotSeeded)?;
    let entries = ports.history.read_all().await?;
    Ok(HistoryView {
        scenario,
        completed_rounds: storyloom_core::history::completed_rounds(entries.len()),
        entries: entries.into_iter().map(HistoryEntryView::from).collect(),
    })
}

/// Retrieves the current round.
///
/// # Errors
///
/// Returns `DomainError::NotSeeded` before initialization.
pub async fn get_current_round(session: &Session) -> Result<RoundView, DomainError> {
    let round = session.current_round().await.ok_or(DomainError::NotSeeded)?;
    let proposal_count = session.ports().proposals.load_round(round.number).await?.len();
    Ok(RoundView {
        number: round.number,
        status: round.status,
        opened_at: round.opened_at,
        proposal_count,
    })
}

/// Lists every registered participant in join order.
///
/// # Errors
///
/// Returns `DomainError` if the registry cannot be read.
pub async fn list_participants(session: &Session) -> Result<Vec<ParticipantView>, DomainError> {
    Ok(session
        .ports()
        .participants
        .list_all()
        .await?
        .into_iter()
        .map(ParticipantView::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use storyloom_core::repository::ParticipantRegistry;
    use storyloom_store::MemorySessionStore;
    use storyloom_test_support::{
        FailingHistoryStore, FixedClock, RecordingSender, ScriptedCompletion, TableEmbeddings,
    };

    use super::*;
    use crate::application::session::{SessionPorts, SessionSettings};

    fn session_over(store: &Arc<MemorySessionStore>) -> Session {
        let ports = SessionPorts {
            history: store.clone(),
            participants: store.clone(),
            proposals: store.clone(),
            completion: Arc::new(ScriptedCompletion::new(["opening"])),
            embeddings: Arc::new(TableEmbeddings::default()),
            sender: Arc::new(RecordingSender::new()),
            clock: Arc::new(FixedClock::standard()),
        };
        Session::new(ports, SessionSettings::default())
    }

    #[tokio::test]
    async fn test_get_history_returns_scenario_and_entries() {
        // Arrange
        let store = Arc::new(MemorySessionStore::new());
        let session = session_over(&store);
        session.initialize("A heist.").await.unwrap();

        // Act
        let view = get_history(&session).await.unwrap();

        // Assert
        assert_eq!(view.scenario, "A heist.");
        assert_eq!(view.completed_rounds, 0);
        assert_eq!(view.entries.len(), 1);
        assert_eq!(view.entries[0].role, EntryRole::Seed);
        assert_eq!(view.entries[0].text, "opening");
    }

    #[tokio::test]
    async fn test_get_current_round_counts_proposals() {
        // Arrange
        let store = Arc::new(MemorySessionStore::new());
        let session = session_over(&store);
        session.initialize("A heist.").await.unwrap();
        session.submit("+1", "crack the safe").await.unwrap();
        session.submit("+2", "bribe the guard").await.unwrap();

        // Act
        let view = get_current_round(&session).await.unwrap();

        // Assert
        assert_eq!(view.number, 0);
        assert_eq!(view.status, RoundStatus::Open);
        assert_eq!(view.opened_at, FixedClock::standard().0);
        assert_eq!(view.proposal_count, 2);
    }

    #[tokio::test]
    async fn test_list_participants_in_join_order() {
        // Arrange
        let store = Arc::new(MemorySessionStore::new());
        let session = session_over(&store);
        let now = FixedClock::standard().0;
        store.register_if_absent("+2", "Bo", now).await.unwrap();
        store.register_if_absent("+1", "Ada", now).await.unwrap();

        // Act
        let views = list_participants(&session).await.unwrap();

        // Assert
        let names: Vec<&str> = views.iter().map(|v| v.display_name.as_str()).collect();
        assert_eq!(names, vec!["Bo", "Ada"]);
    }

    #[tokio::test]
    async fn test_queries_before_seed_report_not_seeded() {
        let store = Arc::new(MemorySessionStore::new());
        let session = session_over(&store);

        assert!(matches!(get_history(&session).await, Err(DomainError::NotSeeded)));
        assert!(matches!(
            get_current_round(&session).await,
            Err(DomainError::NotSeeded)
        ));
    }

    #[tokio::test]
    async fn test_get_history_propagates_store_failure() {
        // Arrange
        let store = Arc::new(MemorySessionStore::new());
        let ports = SessionPorts {
            history: Arc::new(FailingHistoryStore),
            participants: store.clone(),
            proposals: store,
            completion: Arc::new(ScriptedCompletion::new(Vec::<String>::new())),
            embeddings: Arc::new(TableEmbeddings::default()),
            sender: Arc::new(RecordingSender::new()),
            clock: Arc::new(FixedClock::standard()),
        };
        let session = Session::new(ports, SessionSettings::default());

        // Act
        let result = get_history(&session).await;

        // Assert
        match result {
            Err(DomainError::Infrastructure(msg)) => assert_eq!(msg, "connection refused"),
            other => panic!("expected Infrastructure, got {other:?}"),
        }
    }
}
