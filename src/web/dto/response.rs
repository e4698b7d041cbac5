//! Response DTOs for the relay API.

use serde::Serialize;
use utoipa::ToSchema;

use crate::chain::{Message, MintReceipt};
use crate::mail::ContactReceipt;

/// Message list returned by `GET /messages`.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageListResponse {
    /// Messages in ledger order.
    pub data: Vec<Message>,
}

/// Confirmed mint returned by `POST /mint`.
#[derive(Debug, Serialize, ToSchema)]
pub struct MintResponse {
    pub data: MintReceipt,
}

/// Greeting returned by `GET /`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HelloResponse {
    pub hello: String,
}

impl Default for HelloResponse {
    fn default() -> Self {
        Self {
            hello: "world".to_string(),
        }
    }
}

/// Contact submission accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ContactResponse {
    /// Always `"sent"`.
    pub status: String,
    /// Identifier of the delivery; repeated for replayed submissions.
    pub submission_id: String,
}

impl From<ContactReceipt> for ContactResponse {
    fn from(receipt: ContactReceipt) -> Self {
        Self {
            status: "sent".to_string(),
            submission_id: receipt.submission_id,
        }
    }
}
