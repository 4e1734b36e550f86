//! The session coordinator.
//!
//! A [`Session`] owns the round lifecycle and write access to the proposal
//! ledger. One `RwLock` guards the current [`Round`]: submissions take it
//! shared (so they interleave freely), while the closing snapshot and the
//! closing finalization take it exclusively. The long-latency embedding and
//! completion calls run with the lock released; proposals arriving in that
//! window are queued for the next round.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use storyloom_core::clock::Clock;
use storyloom_core::error::DomainError;
use storyloom_core::history::{EntryRole, HistoryEntry, completed_rounds};
use storyloom_core::proposal::Proposal;
use storyloom_core::repository::{HistoryStore, ParticipantRegistry, ProposalStore};
use storyloom_core::services::{ChatMessage, CompletionService, EmbeddingService, MessageSender};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::application::broadcast::{BroadcastReport, broadcast};
use crate::application::vote_selector::VoteSelector;
use crate::domain::aggregates::Round;
use crate::domain::commands::CloseRound;
use crate::domain::context::ContextWindow;
use crate::domain::messages::{
    DEFAULT_ACK_TEXT, DEFAULT_WELCOME_TEXT, EMPTY_ROUND_REMINDER, round_result,
};

/// Runs `fut` with a deadline, mapping expiry to `DomainError::Timeout`.
pub(crate) async fn bounded<T, F>(
    limit: Duration,
    label: &'static str,
    fut: F,
) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| DomainError::Timeout(label))?
}

/// Storage and service ports a session runs against.
#[derive(Clone)]
pub struct SessionPorts {
    /// History log and scenario.
    pub history: Arc<dyn HistoryStore>,
    /// Participant registry.
    pub participants: Arc<dyn ParticipantRegistry>,
    /// Proposal ledger storage.
    pub proposals: Arc<dyn ProposalStore>,
    /// Generative continuation service.
    pub completion: Arc<dyn CompletionService>,
    /// Embedding service.
    pub embeddings: Arc<dyn EmbeddingService>,
    /// Outbound messaging.
    pub sender: Arc<dyn MessageSender>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

/// Tunables for a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Upper bound for each completion or embedding call.
    pub service_timeout: Duration,
    /// Token budget for the model context.
    pub context_window: ContextWindow,
    /// First line of the first-contact reply.
    pub welcome_text: String,
    /// Reply to every proposal.
    pub ack_text: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            service_timeout: Duration::from_secs(60),
            context_window: ContextWindow::default(),
            welcome_text: DEFAULT_WELCOME_TEXT.to_owned(),
            ack_text: DEFAULT_ACK_TEXT.to_owned(),
        }
    }
}

/// Outcome of [`Session::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The scenario was sent to the model and the session seeded.
    Seeded,
    /// The store already held a seed; the session resumed at `round`.
    Resumed {
        /// The round reopened for submissions.
        round: u64,
    },
    /// This session object was already initialized.
    AlreadyInitialized,
}

/// Outcome of [`Session::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Whether the proposal was stored.
    pub accepted: bool,
    /// The round the proposal was submitted to.
    pub round: u64,
}

/// Details of a round that advanced the story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundReport {
    /// The round that closed.
    pub round: u64,
    /// How many proposals took part in the vote.
    pub proposal_count: usize,
    /// Identity of the winning participant.
    pub winner_identity: String,
    /// Display name of the winning participant.
    pub winner_name: String,
    /// The winning proposal.
    pub proposal: String,
    /// The narration the model produced.
    pub narration: String,
    /// Delivery counts for the result broadcast.
    pub broadcast: BroadcastReport,
}

/// Outcome of [`Session::close_round`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// A proposal won and the story advanced.
    Advanced(RoundReport),
    /// No proposals arrived; the round reopened as the next one and a
    /// reminder went out.
    Empty {
        /// The round that closed.
        round: u64,
        /// Delivery counts for the reminder.
        broadcast: BroadcastReport,
    },
    /// Another closing was already in flight; nothing was done.
    Coalesced,
}

/// Everything a closing needs, read under the exclusive lock.
struct ClosingSnapshot {
    round: u64,
    scenario: String,
    history: Vec<HistoryEntry>,
    proposals: Vec<Proposal>,
}

/// A selected proposal together with the narration it produced.
struct Resolution {
    winner: usize,
    narration: String,
}

/// One collaborative story session.
pub struct Session {
    ports: SessionPorts,
    settings: SessionSettings,
    selector: VoteSelector,
    round: RwLock<Option<Round>>,
}

impl Session {
    /// Creates an uninitialized session. Call [`Session::initialize`] before
    /// accepting participants.
    #[must_use]
    pub fn new(ports: SessionPorts, settings: SessionSettings) -> Self {
        let selector = VoteSelector::new(ports.embeddings.clone(), settings.service_timeout);
        Self {
            ports,
            settings,
            selector,
            round: RwLock::new(None),
        }
    }

    /// The ports this session runs against.
    #[must_use]
    pub fn ports(&self) -> &SessionPorts {
        &self.ports
    }

    /// The session's tunables.
    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// A copy of the current round, or `None` before initialization.
    pub async fn current_round(&self) -> Option<Round> {
        self.round.read().await.clone()
    }

    /// Seeds the session from `scenario`, or resumes an already seeded store.
    ///
    /// Seeding asks the model for the opening narration and stores the
    /// scenario and that narration together. A store that already holds a
    /// seed is never reseeded; the open round is recovered from it instead.
    ///
    /// # Errors
    ///
    /// Any error here is fatal to the session: the completion call failing
    /// or timing out, or the store failing. Nothing is written on failure.
    #[instrument(skip(self, scenario))]
    pub async fn initialize(&self, scenario: &str) -> Result<SeedOutcome, DomainError> {
        let mut round = self.round.write().await;
        if round.is_some() {
            return Ok(SeedOutcome::AlreadyInitialized);
        }

        let history = self.ports.history.read_all().await?;
        let (number, outcome) = if history.is_empty() {
            if scenario.trim().is_empty() {
                return Err(DomainError::Validation("scenario text is empty".into()));
            }
            info!("seeding session");
            let opening = bounded(
                self.settings.service_timeout,
                "completion",
                self.ports.completion.complete(&[ChatMessage::user(scenario)]),
            )
            .await?;
            self.ports.history.seed(scenario, &opening).await?;
            (0, SeedOutcome::Seeded)
        } else {
            let number = match self.ports.proposals.earliest_round().await? {
                Some(pending) => pending,
                None => completed_rounds(history.len()),
            };
            info!(round = number, entries = history.len(), "resuming seeded session");
            (number, SeedOutcome::Resumed { round: number })
        };

        *round = Some(Round::open(number, self.ports.clock.now()));
        Ok(outcome)
    }

    /// Submits a proposal for the round currently accepting them.
    ///
    /// While a round is closing, the proposal queues for the next round.
    /// A participant's second proposal for the same round is rejected
    /// (`accepted == false`) and the first one kept.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotSeeded` before initialization, or a store error.
    pub async fn submit(&self, identity: &str, text: &str) -> Result<SubmitOutcome, DomainError> {
        let guard = self.round.read().await;
        let round = guard.as_ref().ok_or(DomainError::NotSeeded)?;
        let number = round.accepting_round();
        let accepted = self
            .ports
            .proposals
            .insert(&Proposal::new(identity, text, number))
            .await?;
        debug!(identity, round = number, accepted, "proposal submitted");
        Ok(SubmitOutcome {
            accepted,
            round: number,
        })
    }

    /// Closes the current round: selects the representative proposal,
    /// advances the story, drains the ledger, opens the next round, and
    /// broadcasts the result.
    ///
    /// If selection or story advancement fails, the round reopens with its
    /// ledger untouched so the next call retries the same proposals.
    ///
    /// # Errors
    ///
    /// Returns the failure that aborted the closing. `DomainError::is_retryable`
    /// tells transient service failures apart from store faults.
    #[instrument(skip(self, command), fields(correlation_id = %command.correlation_id))]
    pub async fn close_round(&self, command: &CloseRound) -> Result<CloseOutcome, DomainError> {
        let Some(snapshot) = self.begin_closing().await? else {
            debug!("closing already in progress; coalesced");
            return Ok(CloseOutcome::Coalesced);
        };
        let round = snapshot.round;

        if snapshot.proposals.is_empty() {
            self.finish_round().await?;
            info!(round, "round closed without proposals");
            let report = self.broadcast_best_effort(EMPTY_ROUND_REMINDER).await;
            return Ok(CloseOutcome::Empty {
                round,
                broadcast: report,
            });
        }

        let resolution = match self.resolve(&snapshot).await {
            Ok(resolution) => resolution,
            Err(err) => {
                self.abort_closing().await;
                warn!(round, error = %err, "round closing failed; proposals kept for retry");
                return Err(err);
            }
        };

        let winner = &snapshot.proposals[resolution.winner];
        if let Err(err) = self.commit(&snapshot, winner, &resolution.narration).await {
            warn!(round, error = %err, "could not record round; proposals kept for retry");
            return Err(err);
        }

        let winner_name = match self.ports.participants.find(&winner.participant_identity).await {
            Ok(Some(participant)) => participant.display_name,
            Ok(None) => winner.participant_identity.clone(),
            Err(err) => {
                warn!(error = %err, "could not resolve winner name");
                winner.participant_identity.clone()
            }
        };
        info!(
            round,
            proposals = snapshot.proposals.len(),
            winner = %winner.participant_identity,
            "round advanced"
        );

        let message = round_result(&winner_name, &winner.text, &resolution.narration);
        let report = self.broadcast_best_effort(&message).await;

        Ok(CloseOutcome::Advanced(RoundReport {
            round,
            proposal_count: snapshot.proposals.len(),
            winner_identity: winner.participant_identity.clone(),
            winner_name,
            proposal: winner.text.clone(),
            narration: resolution.narration,
            broadcast: report,
        }))
    }

    /// Moves the round to `Closing` and reads everything the closing needs.
    /// Returns `None` if the round was not open.
    async fn begin_closing(&self) -> Result<Option<ClosingSnapshot>, DomainError> {
        let mut guard = self.round.write().await;
        let round = guard.as_mut().ok_or(DomainError::NotSeeded)?;
        if !round.begin_closing() {
            return Ok(None);
        }
        let number = round.number;

        let snapshot = async {
            let proposals = self.ports.proposals.load_round(number).await?;
            let history = self.ports.history.read_all().await?;
            let scenario = self
                .ports
                .history
                .scenario()
                .await?
                .ok_or(DomainError::NotSeeded)?;
            Ok::<_, DomainError>(ClosingSnapshot {
                round: number,
                scenario,
                history,
                proposals,
            })
        }
        .await;

        match snapshot {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(err) => {
                round.abort_closing();
                Err(err)
            }
        }
    }

    /// Selects the winner and asks the model to continue the story.
    async fn resolve(&self, snapshot: &ClosingSnapshot) -> Result<Resolution, DomainError> {
        let texts: Vec<&str> = snapshot.proposals.iter().map(|p| p.text.as_str()).collect();
        let winner = self.selector.select(&texts).await?;

        let context = self.settings.context_window.assemble(
            &snapshot.scenario,
            &snapshot.history,
            texts[winner],
        );
        if context.dropped_pairs > 0 {
            debug!(
                dropped_pairs = context.dropped_pairs,
                estimated_tokens = context.estimated_tokens,
                "trimmed story context"
            );
        }

        let narration = bounded(
            self.settings.service_timeout,
            "completion",
            self.ports.completion.complete(&context.messages),
        )
        .await?;
        Ok(Resolution { winner, narration })
    }

    /// Appends the round to history and drains its ledger in one store write,
    /// then opens the next round, all under the exclusive lock.
    async fn commit(
        &self,
        snapshot: &ClosingSnapshot,
        winner: &Proposal,
        narration: &str,
    ) -> Result<(), DomainError> {
        let mut guard = self.round.write().await;
        let round = guard.as_mut().ok_or(DomainError::NotSeeded)?;

        let next_index = snapshot.history.len() as u64;
        let entries = [
            HistoryEntry::new(next_index, EntryRole::Proposal, winner.text.clone()),
            HistoryEntry::new(next_index + 1, EntryRole::Narration, narration),
        ];
        if let Err(err) = self
            .ports
            .history
            .commit_round(snapshot.round, &entries)
            .await
        {
            round.abort_closing();
            return Err(err);
        }
        round.finish(self.ports.clock.now());
        Ok(())
    }

    async fn finish_round(&self) -> Result<(), DomainError> {
        let mut guard = self.round.write().await;
        let round = guard.as_mut().ok_or(DomainError::NotSeeded)?;
        round.finish(self.ports.clock.now());
        Ok(())
    }

    async fn abort_closing(&self) {
        if let Some(round) = self.round.write().await.as_mut() {
            round.abort_closing();
        }
    }

    async fn broadcast_best_effort(&self, message: &str) -> BroadcastReport {
        match broadcast(
            self.ports.participants.as_ref(),
            self.ports.sender.as_ref(),
            message,
        )
        .await
        {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, "broadcast skipped: participants unavailable");
                BroadcastReport::default()
            }
        }
    }
}
