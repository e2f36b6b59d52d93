use axum::{http::StatusCode, response::IntoResponse, Json};

/// Liveness probe. Always answers `200` with the JSON string `"❤"`.
pub async fn heartbeat() -> impl IntoResponse {
    (StatusCode::OK, Json("❤"))
}
