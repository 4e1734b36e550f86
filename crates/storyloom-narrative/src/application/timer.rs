//! The round timer: one background task that closes the current round at a
//! fixed interval until stopped.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use storyloom_core::error::DomainError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::session::{CloseOutcome, Session};
use crate::domain::commands::CloseRound;

/// Outcome of [`RoundTimer::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new timer task was spawned.
    Started,
    /// A timer task was already running; nothing changed.
    AlreadyRunning,
}

struct Running {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Drives [`Session::close_round`] every `interval`.
///
/// The interval is measured from the end of the previous closing, so a slow
/// closing never overlaps the next one. Stopping cancels the wait between
/// closings; a closing already in flight runs to completion first.
pub struct RoundTimer {
    session: Arc<Session>,
    interval: Duration,
    running: Mutex<Option<Running>>,
}

impl RoundTimer {
    /// Creates a stopped timer.
    #[must_use]
    pub fn new(session: Arc<Session>, interval: Duration) -> Self {
        Self {
            session,
            interval,
            running: Mutex::new(None),
        }
    }

    /// The configured interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Running>>, DomainError> {
        self.running
            .lock()
            .map_err(|_| DomainError::Infrastructure("round timer lock poisoned".into()))
    }

    /// Whether the timer task is running.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the internal lock is poisoned.
    pub fn is_running(&self) -> Result<bool, DomainError> {
        Ok(self
            .lock()?
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished()))
    }

    /// Spawns the timer task unless one is already running.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotSeeded` if the session was never initialized.
    pub async fn start(&self) -> Result<StartOutcome, DomainError> {
        if self.session.current_round().await.is_none() {
            return Err(DomainError::NotSeeded);
        }

        let mut running = self.lock()?;
        if running
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
        {
            return Ok(StartOutcome::AlreadyRunning);
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(run(
            self.session.clone(),
            self.interval,
            token.clone(),
        ));
        *running = Some(Running { token, handle });
        info!(interval_secs = self.interval.as_secs(), "round timer started");
        Ok(StartOutcome::Started)
    }

    /// Cancels the timer task and waits for it to exit. Returns `false` if
    /// no task was running.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the internal lock is poisoned
    /// or the task panicked.
    pub async fn stop(&self) -> Result<bool, DomainError> {
        let Some(Running { token, handle }) = self.lock()?.take() else {
            return Ok(false);
        };
        token.cancel();
        handle
            .await
            .map_err(|e| DomainError::Infrastructure(format!("round timer task failed: {e}")))?;
        info!("round timer stopped");
        Ok(true)
    }
}

async fn run(session: Arc<Session>, interval: Duration, token: CancellationToken) {
    loop {
        tokio::select! {
            () = token.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }

        let command = CloseRound::new();
        match session.close_round(&command).await {
            Ok(CloseOutcome::Advanced(report)) => {
                debug!(round = report.round, "timer closed round");
            }
            Ok(CloseOutcome::Empty { round, .. }) => debug!(round, "timer closed empty round"),
            Ok(CloseOutcome::Coalesced) => debug!("timer tick coalesced"),
            Err(err) if err.is_retryable() => {
                warn!(error = %err, "round closing failed; retrying next tick");
            }
            Err(err) => error!(error = %err, "round closing failed"),
        }
    }
}
