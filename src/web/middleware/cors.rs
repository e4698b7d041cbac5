//! CORS middleware configuration.

use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

/// Header carrying the client's idempotency key.
pub const IDEMPOTENCY_KEY: HeaderName = HeaderName::from_static("idempotency-key");

/// Create a CORS layer from configuration.
///
/// Without any valid configured origin, every origin is allowed.
pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    let parsed_origins: Vec<HeaderValue> =
        origins.iter().filter_map(|o| o.parse().ok()).collect();

    if parsed_origins.is_empty() {
        if !origins.is_empty() {
            tracing::warn!(?origins, "No valid CORS origins configured, allowing any origin");
        }
        return CorsLayer::new()
            .allow_methods(methods)
            .allow_headers(Any)
            .allow_origin(Any);
    }

    CorsLayer::new()
        .allow_methods(methods)
        .allow_headers([CONTENT_TYPE, ACCEPT, IDEMPOTENCY_KEY])
        .allow_origin(parsed_origins)
}
