//! Message registry handlers.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::web::dto::{JsonOrForm, MessageListResponse, MintRequest, MintResponse};
use crate::web::error::{ApiError, ErrorBody};
use crate::web::handlers::AppState;

/// GET /messages - List all minted messages.
#[utoipa::path(
    get,
    path = "/messages",
    tag = "messages",
    responses(
        (status = 200, description = "Messages in ledger order", body = MessageListResponse),
        (status = 502, description = "Ledger request failed", body = ErrorBody),
        (status = 503, description = "Ledger not configured", body = ErrorBody)
    )
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageListResponse>, ApiError> {
    let registry = state
        .registry
        .as_ref()
        .ok_or_else(|| ApiError::unavailable("Message registry is not configured"))?;

    let data = registry.list().await?;
    Ok(Json(MessageListResponse { data }))
}

/// POST /mint - Mint a message with the node-managed account.
#[utoipa::path(
    post,
    path = "/mint",
    tag = "messages",
    request_body = MintRequest,
    responses(
        (status = 200, description = "Message minted", body = MintResponse),
        (status = 403, description = "Account authorization denied", body = ErrorBody),
        (status = 404, description = "Mint relay disabled", body = ErrorBody),
        (status = 409, description = "Wrong network", body = ErrorBody),
        (status = 422, description = "Rejected by the ledger", body = ErrorBody),
        (status = 502, description = "Ledger request failed", body = ErrorBody),
        (status = 503, description = "Ledger not configured", body = ErrorBody)
    )
)]
pub async fn mint_message(
    State(state): State<Arc<AppState>>,
    JsonOrForm(request): JsonOrForm<MintRequest>,
) -> Result<Json<MintResponse>, ApiError> {
    let session = state
        .session
        .as_ref()
        .ok_or_else(|| ApiError::not_found("Mint relay is disabled"))?;

    // Mints are serialized through the session lock
    let mut session = session.lock().await;
    let data = session.mint(&request.author, &request.content).await?;
    Ok(Json(MintResponse { data }))
}
