//! Proposals submitted during a round.

use serde::{Deserialize, Serialize};

/// A participant's suggestion for the next action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Who submitted it.
    pub participant_identity: String,
    /// The suggested action.
    pub text: String,
    /// The round this proposal belongs to.
    pub round_number: u64,
}

impl Proposal {
    /// Creates a new proposal.
    #[must_use]
    pub fn new(
        participant_identity: impl Into<String>,
        text: impl Into<String>,
        round_number: u64,
    ) -> Self {
        Self {
            participant_identity: participant_identity.into(),
            text: text.into(),
            round_number,
        }
    }
}
