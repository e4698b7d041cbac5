//! Contact form handler.

use axum::{extract::State, http::HeaderMap, Json};
use std::sync::Arc;

use crate::mail::ContactRequest;
use crate::web::dto::{ContactResponse, JsonOrForm};
use crate::web::error::{ApiError, ErrorBody, ValidationBody};
use crate::web::handlers::AppState;
use crate::web::middleware::cors::IDEMPOTENCY_KEY;

/// POST /contact - Forward a contact form submission by mail.
#[utoipa::path(
    post,
    path = "/contact",
    tag = "contact",
    request_body(content = ContactRequest, description = "JSON or url-encoded form"),
    params(
        ("Idempotency-Key" = Option<String>, Header, description = "Suppresses duplicate sends")
    ),
    responses(
        (status = 200, description = "Message sent", body = ContactResponse),
        (status = 400, description = "Validation failed", body = ValidationBody),
        (status = 409, description = "Same key still in progress", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody),
        (status = 502, description = "Mail transport failed", body = ErrorBody)
    )
)]
pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    JsonOrForm(request): JsonOrForm<ContactRequest>,
) -> Result<Json<ContactResponse>, ApiError> {
    let key = headers
        .get(IDEMPOTENCY_KEY)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty());

    let receipt = state.contact.submit(&request, key).await?;
    Ok(Json(receipt.into()))
}
