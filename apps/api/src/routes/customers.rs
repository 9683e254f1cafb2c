use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::errors::AppError;
use crate::models::{Customer, CustomerPatch, NewCustomer};
use crate::routes::{ApiJson, MessageResponse};
use crate::state::AppState;

/// GET /api/customers
pub async fn handle_list(State(state): State<AppState>) -> Result<Json<Vec<Customer>>, AppError> {
    Ok(Json(state.customers.list().await?))
}

/// POST /api/customers
pub async fn handle_create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewCustomer>,
) -> Result<(StatusCode, Json<Customer>), AppError> {
    let customer = state.customers.create(input).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

/// GET /api/customers/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Customer>, AppError> {
    Ok(Json(state.customers.get(&id).await?))
}

/// PUT /api/customers/:id
pub async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<CustomerPatch>,
) -> Result<Json<Customer>, AppError> {
    Ok(Json(state.customers.update(&id, patch).await?))
}

/// DELETE /api/customers/:id
///
/// Jobs referencing the customer are left untouched.
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.customers.delete(&id).await?;
    Ok(Json(MessageResponse::new("Customer deleted successfully")))
}
