use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::errors::AppError;
use crate::models::{NewRound, Round, RoundPatch};
use crate::routes::{ApiJson, MessageResponse};
use crate::state::AppState;

/// GET /api/rounds
pub async fn handle_list(State(state): State<AppState>) -> Result<Json<Vec<Round>>, AppError> {
    Ok(Json(state.rounds.list().await?))
}

/// POST /api/rounds
pub async fn handle_create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewRound>,
) -> Result<(StatusCode, Json<Round>), AppError> {
    let round = state.rounds.create(input).await?;
    Ok((StatusCode::CREATED, Json(round)))
}

/// GET /api/rounds/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Round>, AppError> {
    Ok(Json(state.rounds.get(&id).await?))
}

/// PUT /api/rounds/:id
pub async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<RoundPatch>,
) -> Result<Json<Round>, AppError> {
    Ok(Json(state.rounds.update(&id, patch).await?))
}

/// DELETE /api/rounds/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.rounds.delete(&id).await?;
    Ok(Json(MessageResponse::new("Round deleted successfully")))
}
