//! Bounded model context.
//!
//! The story history grows every round. [`ContextWindow`] turns the scenario,
//! the history log and the winning proposal into the message list sent to
//! the generative model, dropping the oldest proposal/narration pairs once
//! the estimated token count exceeds the budget. The scenario, the opening
//! narration and the new proposal are always kept.

use storyloom_core::history::{EntryRole, HistoryEntry};
use storyloom_core::services::ChatMessage;

/// Default token budget.
pub const DEFAULT_MAX_TOKENS: usize = 4096;

/// Rough characters-per-token ratio used for estimates.
const CHARS_PER_TOKEN: usize = 4;

/// Token budget for the assembled context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextWindow {
    max_tokens: usize,
}

/// Result of [`ContextWindow::assemble`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledContext {
    /// Messages to send, oldest first.
    pub messages: Vec<ChatMessage>,
    /// How many proposal/narration pairs were left out.
    pub dropped_pairs: usize,
    /// Estimated tokens of `messages`.
    pub estimated_tokens: usize,
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TOKENS)
    }
}

/// Estimated token count of `text`.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

impl ContextWindow {
    /// A window of `max_tokens`. Zero means unlimited.
    #[must_use]
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens }
    }

    /// The configured budget (zero is unlimited).
    #[must_use]
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Builds the message list for continuing the story with `proposal`.
    ///
    /// `history` must start with the seed entry. Entries after it are read as
    /// proposal/narration pairs; a trailing unpaired entry is ignored.
    #[must_use]
    pub fn assemble(
        &self,
        scenario: &str,
        history: &[HistoryEntry],
        proposal: &str,
    ) -> AssembledContext {
        let opening = history
            .first()
            .filter(|e| e.role == EntryRole::Seed)
            .map(|e| e.text.as_str());
        let pairs: Vec<(&str, &str)> = history
            .get(1..)
            .unwrap_or_default()
            .chunks_exact(2)
            .map(|pair| (pair[0].text.as_str(), pair[1].text.as_str()))
            .collect();

        let budget = if self.max_tokens == 0 {
            usize::MAX
        } else {
            self.max_tokens
        };
        let mut used = estimate_tokens(scenario)
            + opening.map_or(0, estimate_tokens)
            + estimate_tokens(proposal);

        // Keep the newest pairs that still fit.
        let mut kept = 0;
        for (user, assistant) in pairs.iter().rev() {
            let cost = estimate_tokens(user) + estimate_tokens(assistant);
            if used.saturating_add(cost) > budget {
                break;
            }
            used += cost;
            kept += 1;
        }
        let dropped_pairs = pairs.len() - kept;

        let mut messages = Vec::with_capacity(3 + kept * 2);
        messages.push(ChatMessage::user(scenario));
        if let Some(opening) = opening {
            messages.push(ChatMessage::assistant(opening));
        }
        for (user, assistant) in &pairs[dropped_pairs..] {
            messages.push(ChatMessage::user(*user));
            messages.push(ChatMessage::assistant(*assistant));
        }
        messages.push(ChatMessage::user(proposal));

        AssembledContext {
            messages,
            dropped_pairs,
            estimated_tokens: used,
        }
    }
}
