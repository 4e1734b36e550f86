//! Read-only views of the story session.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use tracing::instrument;

use storyloom_narrative::application::query_handlers::{
    self, HistoryView, ParticipantView, RoundView,
};

use crate::error::ApiError;
use crate::state::AppState;

/// GET /history
#[instrument(skip(state))]
async fn get_history(State(state): State<AppState>) -> Result<Json<HistoryView>, ApiError> {
    let view = query_handlers::get_history(&state.session).await?;
    Ok(Json(view))
}

/// GET /round
#[instrument(skip(state))]
async fn get_round(State(state): State<AppState>) -> Result<Json<RoundView>, ApiError> {
    let view = query_handlers::get_current_round(&state.session).await?;
    Ok(Json(view))
}

/// GET /participants
#[instrument(skip(state))]
async fn list_participants(
    State(state): State<AppState>,
) -> Result<Json<Vec<ParticipantView>>, ApiError> {
    let views = query_handlers::list_participants(&state.session).await?;
    Ok(Json(views))
}

/// Returns the router for the story views.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/history", get(get_history))
        .route("/round", get(get_round))
        .route("/participants", get(list_participants))
}
