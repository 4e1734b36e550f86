//! Shared application state.

use std::sync::Arc;

use storyloom_narrative::application::session::Session;
use storyloom_narrative::application::timer::RoundTimer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The story session.
    pub session: Arc<Session>,
    /// The timer closing the session's rounds.
    pub timer: Arc<RoundTimer>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(session: Arc<Session>, timer: Arc<RoundTimer>) -> Self {
        Self { session, timer }
    }
}
