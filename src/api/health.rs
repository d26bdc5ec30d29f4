use axum::http::StatusCode;

/// Liveness probe, no authentication
pub async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
