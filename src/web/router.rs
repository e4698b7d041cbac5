//! Router configuration for the relay API.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::dto::{ContactResponse, HelloResponse, MessageListResponse, MintRequest, MintResponse};
use super::error::{ErrorBody, ErrorCode, ErrorDetail, FieldError, ValidationBody};
use super::handlers::{self, health_check, hello, list_messages, mint_message, submit_contact, AppState};
use super::middleware::{contact_rate_limit, create_cors_layer, RateLimitState};
use crate::chain::{Message, MintReceipt};
use crate::mail::ContactRequest;

/// OpenAPI document for the relay.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::index::hello,
        handlers::index::health_check,
        handlers::contact::submit_contact,
        handlers::messages::list_messages,
        handlers::messages::mint_message,
    ),
    components(schemas(
        ContactRequest,
        ContactResponse,
        HelloResponse,
        MessageListResponse,
        MintRequest,
        MintResponse,
        Message,
        MintReceipt,
        ErrorBody,
        ErrorDetail,
        ErrorCode,
        ValidationBody,
        FieldError,
    )),
    tags(
        (name = "status", description = "Liveness"),
        (name = "contact", description = "Contact form relay"),
        (name = "messages", description = "Message registry")
    )
)]
pub struct ApiDoc;

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    rate_limit: Arc<RateLimitState>,
    cors_origins: &[String],
) -> Router {
    // Only the contact form is rate limited
    let contact_routes = Router::new()
        .route("/contact", post(submit_contact))
        .route_layer(middleware::from_fn(move |req, next| {
            let state = rate_limit.clone();
            contact_rate_limit(state, req, next)
        }));

    Router::new()
        .route("/", get(hello))
        .route("/health", get(health_check))
        .route("/messages", get(list_messages))
        .route("/mint", post(mint_message))
        .merge(contact_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins)),
        )
        .with_state(app_state)
}

/// Create the Swagger UI router serving the OpenAPI document.
pub fn create_swagger_router() -> Router {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for path in ["/", "/health", "/contact", "/messages", "/mint"] {
            assert!(
                paths.iter().any(|p| p.as_str() == path),
                "missing {path} in {paths:?}"
            );
        }
    }

    #[test]
    fn test_create_swagger_router() {
        let _router = create_swagger_router();
    }
}
