//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
///
/// Variants fall into three groups: local rejections (`Validation`),
/// retryable failures of a round closing (`Upstream`, `Timeout`,
/// `ConcurrencyConflict`), and session-level faults (`NotSeeded`,
/// `AlreadySeeded`, `Infrastructure`).
#[derive(Debug, Error)]
pub enum DomainError {
    /// The session has not been seeded yet.
    #[error("session has not been seeded")]
    NotSeeded,

    /// The session already holds a seed and must not be reseeded.
    #[error("session is already seeded")]
    AlreadySeeded,

    /// A history append did not start at the current end of the log.
    #[error("history conflict: expected next index {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The index the writer expected to append at.
        expected: u64,
        /// The index the log actually ends at.
        actual: u64,
    },

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An external service (completion, embedding, messaging) failed.
    #[error("upstream service error: {0}")]
    Upstream(String),

    /// An external service call exceeded its time budget.
    #[error("{0} timed out")]
    Timeout(&'static str),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Returns `true` when retrying the same operation later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Upstream(_) | Self::Timeout(_) | Self::ConcurrencyConflict { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_and_timeout_are_retryable() {
        assert!(DomainError::Upstream("503".into()).is_retryable());
        assert!(DomainError::Timeout("completion").is_retryable());
        assert!(
            DomainError::ConcurrencyConflict {
                expected: 3,
                actual: 5
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_session_faults_are_not_retryable() {
        assert!(!DomainError::NotSeeded.is_retryable());
        assert!(!DomainError::Validation("empty".into()).is_retryable());
        assert!(!DomainError::Infrastructure("disk full".into()).is_retryable());
    }

    #[test]
    fn test_timeout_message_names_the_operation() {
        assert_eq!(
            DomainError::Timeout("embedding").to_string(),
            "embedding timed out"
        );
    }
}
