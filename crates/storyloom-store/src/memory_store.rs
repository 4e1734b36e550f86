//! In-process implementation of the session store ports.
//!
//! Nothing survives a restart. Used when no database is configured and
//! throughout the test suites.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use storyloom_core::error::DomainError;
use storyloom_core::history::{EntryRole, HistoryEntry};
use storyloom_core::participant::Participant;
use storyloom_core::proposal::Proposal;
use storyloom_core::repository::{
    HistoryStore, ParticipantRegistry, ProposalStore, check_append,
};

#[derive(Debug, Default)]
struct Inner {
    scenario: Option<String>,
    history: Vec<HistoryEntry>,
    participants: Vec<Participant>,
    proposals: BTreeMap<u64, Vec<Proposal>>,
}

/// Session store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<Inner>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, DomainError> {
        self.inner
            .lock()
            .map_err(|e| DomainError::Infrastructure(format!("store lock poisoned: {e}")))
    }
}

#[async_trait]
impl HistoryStore for MemorySessionStore {
    async fn scenario(&self) -> Result<Option<String>, DomainError> {
        Ok(self.lock()?.scenario.clone())
    }

    async fn seed(&self, scenario: &str, opening: &str) -> Result<(), DomainError> {
        let mut inner = self.lock()?;
        if inner.scenario.is_some() || !inner.history.is_empty() {
            return Err(DomainError::AlreadySeeded);
        }
        inner.scenario = Some(scenario.to_owned());
        inner
            .history
            .push(HistoryEntry::new(0, EntryRole::Seed, opening));
        Ok(())
    }

    async fn append(&self, entries: &[HistoryEntry]) -> Result<(), DomainError> {
        let mut inner = self.lock()?;
        check_append(inner.history.len() as u64, entries)?;
        inner.history.extend_from_slice(entries);
        Ok(())
    }

    async fn commit_round(&self, round: u64, entries: &[HistoryEntry]) -> Result<(), DomainError> {
        let mut inner = self.lock()?;
        check_append(inner.history.len() as u64, entries)?;
        inner.history.extend_from_slice(entries);
        inner.proposals.remove(&round);
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<HistoryEntry>, DomainError> {
        Ok(self.lock()?.history.clone())
    }
}

#[async_trait]
impl ParticipantRegistry for MemorySessionStore {
    async fn register_if_absent(
        &self,
        identity: &str,
        display_name: &str,
        joined_at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let mut inner = self.lock()?;
        if inner.participants.iter().any(|p| p.identity == identity) {
            return Ok(false);
        }
        inner.participants.push(Participant {
            identity: identity.to_owned(),
            display_name: display_name.to_owned(),
            joined_at,
        });
        Ok(true)
    }

    async fn list_all(&self) -> Result<Vec<Participant>, DomainError> {
        Ok(self.lock()?.participants.clone())
    }

    async fn find(&self, identity: &str) -> Result<Option<Participant>, DomainError> {
        Ok(self
            .lock()?
            .participants
            .iter()
            .find(|p| p.identity == identity)
            .cloned())
    }
}

#[async_trait]
impl ProposalStore for MemorySessionStore {
    async fn insert(&self, proposal: &Proposal) -> Result<bool, DomainError> {
        let mut inner = self.lock()?;
        let round = inner.proposals.entry(proposal.round_number).or_default();
        if round
            .iter()
            .any(|p| p.participant_identity == proposal.participant_identity)
        {
            return Ok(false);
        }
        round.push(proposal.clone());
        Ok(true)
    }

    async fn load_round(&self, round: u64) -> Result<Vec<Proposal>, DomainError> {
        Ok(self
            .lock()?
            .proposals
            .get(&round)
            .cloned()
            .unwrap_or_default())
    }

    async fn earliest_round(&self) -> Result<Option<u64>, DomainError> {
        Ok(self
            .lock()?
            .proposals
            .iter()
            .find(|(_, proposals)| !proposals.is_empty())
            .map(|(round, _)| *round))
    }
}
