//! Round lifecycle aggregate.
//!
//! Exactly one round is current at any time. It moves
//! `Open -> Closing -> Closed -> Open(number + 1)`; a failed closing moves it
//! back from `Closing` to `Open` with the same number.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Where a round is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    /// Accepting proposals.
    Open,
    /// The timer fired; selection and story advancement are in flight.
    Closing,
    /// Selection, history advance and broadcast are done.
    Closed,
}

/// The current round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Round {
    /// Round number, starting at 0.
    pub number: u64,
    /// Lifecycle status.
    pub status: RoundStatus,
    /// When this round opened.
    pub opened_at: DateTime<Utc>,
}

impl Round {
    /// Opens round `number`.
    #[must_use]
    pub fn open(number: u64, opened_at: DateTime<Utc>) -> Self {
        Self {
            number,
            status: RoundStatus::Open,
            opened_at,
        }
    }

    /// The round a proposal submitted right now belongs to. While this round
    /// is closing, new proposals queue for the next one.
    #[must_use]
    pub fn accepting_round(&self) -> u64 {
        match self.status {
            RoundStatus::Open => self.number,
            RoundStatus::Closing | RoundStatus::Closed => self.number + 1,
        }
    }

    /// Moves `Open -> Closing`. Returns `false` (and changes nothing) when the
    /// round is not open, so overlapping timer firings coalesce.
    pub fn begin_closing(&mut self) -> bool {
        if self.status != RoundStatus::Open {
            return false;
        }
        self.status = RoundStatus::Closing;
        true
    }

    /// Moves `Closing -> Open` for a retry of the same round.
    pub fn abort_closing(&mut self) {
        if self.status == RoundStatus::Closing {
            self.status = RoundStatus::Open;
        }
    }

    /// Moves `Closing -> Closed -> Open(number + 1)` and returns the new
    /// round number. Does nothing unless the round is closing.
    pub fn finish(&mut self, now: DateTime<Utc>) -> u64 {
        if self.status == RoundStatus::Closing {
            self.status = RoundStatus::Closed;
            *self = Self::open(self.number + 1, now);
        }
        self.number
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn t(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, minute, 0).unwrap()
    }

    #[test]
    fn test_open_round_accepts_into_itself() {
        let round = Round::open(3, t(0));

        assert_eq!(round.status, RoundStatus::Open);
        assert_eq!(round.accepting_round(), 3);
    }

    #[test]
    fn test_closing_round_queues_into_next() {
        // Arrange
        let mut round = Round::open(3, t(0));

        // Act
        let began = round.begin_closing();

        // Assert
        assert!(began);
        assert_eq!(round.status, RoundStatus::Closing);
        assert_eq!(round.accepting_round(), 4);
    }

    #[test]
    fn test_begin_closing_twice_coalesces() {
        let mut round = Round::open(0, t(0));
        assert!(round.begin_closing());

        assert!(!round.begin_closing());
        assert_eq!(round.status, RoundStatus::Closing);
    }

    #[test]
    fn test_abort_closing_reopens_same_round() {
        // Arrange
        let mut round = Round::open(2, t(0));
        round.begin_closing();

        // Act
        round.abort_closing();

        // Assert
        assert_eq!(round, Round::open(2, t(0)));
    }

    #[test]
    fn test_finish_opens_next_round() {
        // Arrange
        let mut round = Round::open(2, t(0));
        round.begin_closing();

        // Act
        let next = round.finish(t(10));

        // Assert
        assert_eq!(next, 3);
        assert_eq!(round, Round::open(3, t(10)));
    }

    #[test]
    fn test_finish_without_closing_is_ignored() {
        let mut round = Round::open(2, t(0));

        assert_eq!(round.finish(t(10)), 2);
        assert_eq!(round.opened_at, t(0));
    }
}
