use axum::{Json, response::IntoResponse};
use serde_json::json;

/// Liveness probe.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
