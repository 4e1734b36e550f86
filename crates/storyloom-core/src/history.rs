//! History log entries.

use serde::{Deserialize, Serialize};

/// The kind of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryRole {
    /// The opening narration generated from the scenario. Always index 0.
    Seed,
    /// The winning proposal of a round.
    Proposal,
    /// The narration produced in answer to the preceding proposal.
    Narration,
}

impl EntryRole {
    /// Stable string form used by storage engines.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Proposal => "proposal",
            Self::Narration => "narration",
        }
    }

    /// Parses the stable string form produced by [`EntryRole::as_str`].
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "seed" => Some(Self::Seed),
            "proposal" => Some(Self::Proposal),
            "narration" => Some(Self::Narration),
            _ => None,
        }
    }

    /// The role an entry at `index` must carry in a well-formed log.
    #[must_use]
    pub fn expected_at(index: u64) -> Self {
        match index {
            0 => Self::Seed,
            i if i % 2 == 1 => Self::Proposal,
            _ => Self::Narration,
        }
    }
}

/// One entry of the append-only history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Position in the log, starting at 0.
    pub index: u64,
    /// What this entry is.
    pub role: EntryRole,
    /// Entry text.
    pub text: String,
}

impl HistoryEntry {
    /// Creates a new entry.
    #[must_use]
    pub fn new(index: u64, role: EntryRole, text: impl Into<String>) -> Self {
        Self {
            index,
            role,
            text: text.into(),
        }
    }
}

/// Number of completed rounds recorded in a log of `len` entries.
#[must_use]
pub fn completed_rounds(len: usize) -> u64 {
    (len.saturating_sub(1) / 2) as u64
}
