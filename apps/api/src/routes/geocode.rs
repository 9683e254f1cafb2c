use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::geocoding::{self, PlaceCandidate, VerifiedAddress, DEFAULT_SUGGESTION_LIMIT};
use crate::routes::{ApiJson, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub address: String,
}

/// GET /api/geocode/suggest?q=...
///
/// Autocomplete proxy. An unavailable provider yields an empty list.
pub async fn handle_suggest(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SuggestQuery>,
) -> Result<Json<Vec<PlaceCandidate>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT);
    Ok(Json(
        geocoding::suggest(state.geocoder.as_ref(), &query.q, limit).await,
    ))
}

/// POST /api/geocode/verify
pub async fn handle_verify(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<VerifyRequest>,
) -> Result<Json<VerifiedAddress>, AppError> {
    Ok(Json(
        geocoding::verify(
            state.geocoder.as_ref(),
            &req.address,
            state.geocode_threshold,
        )
        .await,
    ))
}
