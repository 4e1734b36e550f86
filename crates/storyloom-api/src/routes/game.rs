//! Game control: starting and stopping the round timer.

use axum::extract::State;
use axum::{Json, Router, routing::post};
use serde::Serialize;
use tracing::{info, instrument};

use storyloom_narrative::application::timer::StartOutcome;

use crate::error::ApiError;
use crate::state::AppState;

/// Response body for game control commands.
#[derive(Debug, Serialize)]
pub struct ControlResponse {
    /// What happened.
    pub message: &'static str,
    /// Seconds between round closings.
    pub round_interval_secs: u64,
}

/// POST /start_game
#[instrument(skip(state))]
async fn start_game(State(state): State<AppState>) -> Result<Json<ControlResponse>, ApiError> {
    let message = match state.timer.start().await? {
        StartOutcome::Started => "game started",
        StartOutcome::AlreadyRunning => "game already started",
    };
    info!(message, "handled start_game");
    Ok(Json(ControlResponse {
        message,
        round_interval_secs: state.timer.interval().as_secs(),
    }))
}

/// POST /stop_game
#[instrument(skip(state))]
async fn stop_game(State(state): State<AppState>) -> Result<Json<ControlResponse>, ApiError> {
    let message = if state.timer.stop().await? {
        "game stopped"
    } else {
        "game not running"
    };
    info!(message, "handled stop_game");
    Ok(Json(ControlResponse {
        message,
        round_interval_secs: state.timer.interval().as_secs(),
    }))
}

/// Returns the game control router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/start_game", post(start_game))
        .route("/stop_game", post(stop_game))
}
