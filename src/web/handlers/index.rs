//! Liveness handlers.

use axum::Json;

use crate::web::dto::HelloResponse;

/// GET / - Greeting.
#[utoipa::path(
    get,
    path = "/",
    tag = "status",
    responses(
        (status = 200, description = "Greeting", body = HelloResponse)
    )
)]
pub async fn hello() -> Json<HelloResponse> {
    Json(HelloResponse::default())
}

/// GET /health - Health check.
#[utoipa::path(
    get,
    path = "/health",
    tag = "status",
    responses(
        (status = 200, description = "Service is up", body = String)
    )
)]
pub async fn health_check() -> &'static str {
    "OK"
}
