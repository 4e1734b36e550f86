//! Vote selector: picks the most representative proposal by embedding every
//! text and taking the 1-medoid.

use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use storyloom_core::error::DomainError;
use storyloom_core::services::EmbeddingService;
use tracing::debug;

use crate::application::session::bounded;
use crate::domain::medoid::medoid_index;

/// Embedding-space medoid vote.
pub struct VoteSelector {
    embeddings: Arc<dyn EmbeddingService>,
    timeout: Duration,
}

impl VoteSelector {
    /// Creates a selector that bounds each embedding call by `timeout`.
    #[must_use]
    pub fn new(embeddings: Arc<dyn EmbeddingService>, timeout: Duration) -> Self {
        Self {
            embeddings,
            timeout,
        }
    }

    /// Returns the index of the winning text.
    ///
    /// A single proposal (or a set of identical texts) wins without any
    /// embedding call. Identical texts are embedded once but each still
    /// counts as its own point.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an empty slice, and the
    /// embedding service's error (or `DomainError::Timeout`) if any
    /// embedding fails.
    pub async fn select(&self, texts: &[&str]) -> Result<usize, DomainError> {
        match texts.len() {
            0 => return Err(DomainError::Validation("no proposals to select from".into())),
            1 => return Ok(0),
            _ => {}
        }

        let mut distinct: Vec<&str> = Vec::new();
        let slots: Vec<usize> = texts
            .iter()
            .map(|text| {
                distinct.iter().position(|d| d == text).unwrap_or_else(|| {
                    distinct.push(*text);
                    distinct.len() - 1
                })
            })
            .collect();
        if distinct.len() == 1 {
            return Ok(0);
        }

        debug!(
            proposals = texts.len(),
            distinct = distinct.len(),
            "embedding proposals"
        );
        let vectors = try_join_all(distinct.iter().map(|text| {
            bounded(self.timeout, "embedding", self.embeddings.embed(text))
        }))
        .await?;

        let points: Vec<&[f32]> = slots.iter().map(|&slot| vectors[slot].as_slice()).collect();
        medoid_index(&points)
    }
}
