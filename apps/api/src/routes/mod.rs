pub mod customers;
pub mod geocode;
pub mod health;
pub mod jobs;
pub mod rounds;

use axum::{
    extract::{FromRequest, FromRequestParts},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::state::AppState;

/// JSON body extractor whose rejections use the API's `{message}` error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor whose rejections use the API's `{message}` error shape.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        // Customers
        .route(
            "/api/customers",
            get(customers::handle_list).post(customers::handle_create),
        )
        .route(
            "/api/customers/:id",
            get(customers::handle_get)
                .put(customers::handle_update)
                .delete(customers::handle_delete),
        )
        // Jobs
        .route(
            "/api/jobs",
            get(jobs::handle_list).post(jobs::handle_create),
        )
        .route(
            "/api/jobs/generate-recurring",
            post(jobs::handle_generate_recurring),
        )
        .route(
            "/api/jobs/:id",
            get(jobs::handle_get)
                .put(jobs::handle_update)
                .delete(jobs::handle_delete),
        )
        .route("/api/jobs/:id/status", put(jobs::handle_update_status))
        // Rounds
        .route(
            "/api/rounds",
            get(rounds::handle_list).post(rounds::handle_create),
        )
        .route(
            "/api/rounds/:id",
            get(rounds::handle_get)
                .put(rounds::handle_update)
                .delete(rounds::handle_delete),
        )
        // Geocoding
        .route("/api/geocode/suggest", get(geocode::handle_suggest))
        .route("/api/geocode/verify", post(geocode::handle_verify))
        .with_state(state)
}
