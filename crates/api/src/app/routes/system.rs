use axum::{http::StatusCode, response::IntoResponse, Json};

/// GET /health - liveness probe, deliberately unauthenticated.
pub async fn health() -> axum::response::Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "ok" })),
    )
        .into_response()
}
