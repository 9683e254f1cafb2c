use axum::Json;
use serde_json::{json, Value};

/// GET /
pub async fn root_handler() -> &'static str {
    "Cleaning Service API is running"
}

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "cleaning-api"
    }))
}
