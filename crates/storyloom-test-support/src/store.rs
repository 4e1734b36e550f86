//! Test stores — failing store implementations for error paths.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use storyloom_core::error::DomainError;
use storyloom_core::history::HistoryEntry;
use storyloom_core::repository::HistoryStore;

/// A history store that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingHistoryStore;

fn refused() -> DomainError {
    DomainError::Infrastructure("connection refused".into())
}

#[async_trait]
impl HistoryStore for FailingHistoryStore {
    async fn scenario(&self) -> Result<Option<String>, DomainError> {
        Err(refused())
    }

    async fn seed(&self, _scenario: &str, _opening: &str) -> Result<(), DomainError> {
        Err(refused())
    }

    async fn append(&self, _entries: &[HistoryEntry]) -> Result<(), DomainError> {
        Err(refused())
    }

    async fn commit_round(&self, _round: u64, _entries: &[HistoryEntry]) -> Result<(), DomainError> {
        Err(refused())
    }

    async fn read_all(&self) -> Result<Vec<HistoryEntry>, DomainError> {
        Err(refused())
    }
}

/// Wraps a real history store and fails its first `commit_round` before
/// anything is written, as if the process died mid-commit.
pub struct InterruptedCommit {
    inner: Arc<dyn HistoryStore>,
    interrupted: AtomicBool,
}

impl InterruptedCommit {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn HistoryStore>) -> Self {
        Self {
            inner,
            interrupted: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl HistoryStore for InterruptedCommit {
    async fn scenario(&self) -> Result<Option<String>, DomainError> {
        self.inner.scenario().await
    }

    async fn seed(&self, scenario: &str, opening: &str) -> Result<(), DomainError> {
        self.inner.seed(scenario, opening).await
    }

    async fn append(&self, entries: &[HistoryEntry]) -> Result<(), DomainError> {
        self.inner.append(entries).await
    }

    async fn commit_round(&self, round: u64, entries: &[HistoryEntry]) -> Result<(), DomainError> {
        if !self.interrupted.swap(true, Ordering::SeqCst) {
            return Err(refused());
        }
        self.inner.commit_round(round, entries).await
    }

    async fn read_all(&self) -> Result<Vec<HistoryEntry>, DomainError> {
        self.inner.read_all().await
    }
}
