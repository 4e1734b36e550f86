//! Participants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A known participant, keyed by `identity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Opaque, unique identity (for SMS this is the phone number).
    pub identity: String,
    /// Name shown when this participant's proposal wins.
    pub display_name: String,
    /// When the participant first made contact.
    pub joined_at: DateTime<Utc>,
}
