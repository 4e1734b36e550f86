//! Storage ports for the session's persisted state.
//!
//! Four pieces of state survive a restart when the engine is durable: the
//! scenario (seed) text, the append-only history log, the participant set,
//! and the per-round proposal sets.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DomainError;
use crate::history::{EntryRole, HistoryEntry};
use crate::participant::Participant;
use crate::proposal::Proposal;

/// Append-only, ordered history log plus the scenario it was seeded from.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Returns the persisted scenario text, or `None` before seeding.
    async fn scenario(&self) -> Result<Option<String>, DomainError>;

    /// Persists the scenario and the opening narration (entry 0) in one step.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AlreadySeeded` if a seed already exists.
    async fn seed(&self, scenario: &str, opening: &str) -> Result<(), DomainError>;

    /// Appends entries atomically. The first entry's index must equal the
    /// current log length and the batch must be whole, contiguous
    /// proposal/narration pairs.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` if the log end moved and
    /// `DomainError::Validation` for a malformed batch.
    async fn append(&self, entries: &[HistoryEntry]) -> Result<(), DomainError>;

    /// Appends a closed round's entries and drains that round's proposals as
    /// one atomic write. On error neither the log nor the proposals change.
    ///
    /// # Errors
    ///
    /// Same as [`HistoryStore::append`], plus store failures.
    async fn commit_round(&self, round: u64, entries: &[HistoryEntry]) -> Result<(), DomainError>;

    /// Returns every entry in index order.
    async fn read_all(&self) -> Result<Vec<HistoryEntry>, DomainError>;
}

/// Growth-only registry of participants.
#[async_trait]
pub trait ParticipantRegistry: Send + Sync {
    /// Registers `identity` unless it is already known. Returns `true` when
    /// the participant is new.
    async fn register_if_absent(
        &self,
        identity: &str,
        display_name: &str,
        joined_at: DateTime<Utc>,
    ) -> Result<bool, DomainError>;

    /// Returns all participants in first-seen order.
    async fn list_all(&self) -> Result<Vec<Participant>, DomainError>;

    /// Looks up a single participant.
    async fn find(&self, identity: &str) -> Result<Option<Participant>, DomainError>;
}

/// Persisted side of the proposal ledger.
#[async_trait]
pub trait ProposalStore: Send + Sync {
    /// Stores `proposal` unless its participant already has an entry for the
    /// same round. Returns `true` when stored.
    async fn insert(&self, proposal: &Proposal) -> Result<bool, DomainError>;

    /// Returns a round's proposals in acceptance order.
    async fn load_round(&self, round: u64) -> Result<Vec<Proposal>, DomainError>;

    /// Lowest round number with stored proposals. Used to recover the open
    /// round after a restart.
    async fn earliest_round(&self) -> Result<Option<u64>, DomainError>;
}

/// Validates that `entries` can be appended to a log of `current_len` entries.
///
/// Shared by every `HistoryStore` implementation so they agree on the rules.
///
/// # Errors
///
/// Returns `DomainError::ConcurrencyConflict` or `DomainError::Validation`.
pub fn check_append(current_len: u64, entries: &[HistoryEntry]) -> Result<(), DomainError> {
    let Some(first) = entries.first() else {
        return Err(DomainError::Validation("history batch is empty".into()));
    };
    if current_len == 0 {
        return Err(DomainError::NotSeeded);
    }
    if first.index != current_len {
        return Err(DomainError::ConcurrencyConflict {
            expected: first.index,
            actual: current_len,
        });
    }
    for (offset, entry) in entries.iter().enumerate() {
        let index = current_len + offset as u64;
        if entry.index != index {
            return Err(DomainError::Validation(format!(
                "history batch is not contiguous at index {index}"
            )));
        }
        if entry.role != EntryRole::expected_at(index) {
            return Err(DomainError::Validation(format!(
                "history entry {index} must be a {}",
                EntryRole::expected_at(index).as_str()
            )));
        }
    }
    // Roles already alternate, so an odd batch ends on a dangling proposal.
    if entries.len() % 2 != 0 {
        return Err(DomainError::Validation(
            "history batch must end with a narration".into(),
        ));
    }
    Ok(())
}
