//! Request DTOs for the relay API.

use serde::Deserialize;
use utoipa::ToSchema;

/// Mint request relayed to the message registry.
///
/// Content is not checked here; the contract decides what it accepts.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MintRequest {
    /// Author name.
    #[serde(default)]
    pub author: String,
    /// Message text.
    #[serde(default)]
    pub content: String,
}
