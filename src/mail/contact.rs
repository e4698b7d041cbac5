//! Contact form relay.
//!
//! A [`ContactRequest`] is validated as a whole and then forwarded as a single
//! mail to the configured owner address. Either the whole message is sent or
//! the whole request fails.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use thiserror::Error;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use super::idempotency::{Claim, IdempotencyLedger};
use super::transport::{MailError, MailTransport};
use super::types::OutgoingMail;

/// A contact form submission.
///
/// Missing fields deserialize as empty strings so that validation can report
/// every failed field at once.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct ContactRequest {
    /// Sender name.
    #[serde(default)]
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    /// Sender email address.
    #[serde(default)]
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    /// Mail subject.
    #[serde(default)]
    #[validate(length(min = 1, message = "Subject is required"))]
    pub subject: String,
    /// Message text.
    #[serde(default)]
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
}

impl ContactRequest {
    /// Field names in form order, used to order validation reports.
    pub const FIELDS: &'static [&'static str] = &["name", "email", "subject", "message"];

    /// Create a new contact request.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            subject: subject.into(),
            message: message.into(),
        }
    }

    /// Digest identifying this submission's content.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha3_256::new();
        for field in [&self.name, &self.email, &self.subject, &self.message] {
            hasher.update((field.len() as u64).to_be_bytes());
            hasher.update(field.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Render the mail that forwards this submission to `to`.
    pub fn to_mail(&self, to: &str) -> OutgoingMail {
        let body = format!(
            "Name: {}\nEmail: {}\n\n{}",
            self.name, self.email, self.message
        );
        OutgoingMail::new(to, self.subject.clone(), body).with_reply_to(self.email.clone())
    }
}

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactReceipt {
    /// Identifier of the delivery.
    pub submission_id: String,
    /// Whether this answer was replayed from an earlier delivery.
    pub replayed: bool,
}

/// Contact submission errors.
#[derive(Error, Debug)]
pub enum ContactError {
    /// One or more fields failed validation.
    #[error("validation failed: {0}")]
    Invalid(#[from] ValidationErrors),

    /// A submission with the same idempotency key is still being delivered.
    #[error("a submission with this idempotency key is in progress")]
    InProgress,

    /// The idempotency key was already used for a different submission.
    #[error("idempotency key was already used for a different submission")]
    KeyReused,

    /// The mail transport failed.
    #[error(transparent)]
    Transport(#[from] MailError),
}

/// Service that validates and forwards contact submissions.
pub struct ContactService {
    transport: Arc<dyn MailTransport>,
    to_address: String,
    ledger: IdempotencyLedger,
}

impl ContactService {
    /// Create a new service delivering to `to_address`.
    pub fn new(
        transport: Arc<dyn MailTransport>,
        to_address: impl Into<String>,
        idempotency_window: Duration,
    ) -> Self {
        Self {
            transport,
            to_address: to_address.into(),
            ledger: IdempotencyLedger::new(idempotency_window),
        }
    }

    /// The idempotency ledger.
    pub fn ledger(&self) -> &IdempotencyLedger {
        &self.ledger
    }

    /// Validate and forward a submission.
    ///
    /// With an idempotency key, a submission already delivered under the same
    /// key is not sent again; the earlier receipt is returned with
    /// `replayed = true`.
    pub async fn submit(
        &self,
        request: &ContactRequest,
        idempotency_key: Option<&str>,
    ) -> Result<ContactReceipt, ContactError> {
        request.validate()?;

        let Some(key) = idempotency_key else {
            let submission_id = self.deliver(request).await?;
            return Ok(ContactReceipt {
                submission_id,
                replayed: false,
            });
        };

        match self.ledger.claim(key, &request.fingerprint()) {
            Claim::Delivered(submission_id) => {
                tracing::info!(%submission_id, "Duplicate contact submission ignored");
                Ok(ContactReceipt {
                    submission_id,
                    replayed: true,
                })
            }
            Claim::InFlight => Err(ContactError::InProgress),
            Claim::Mismatch => {
                tracing::warn!(key = %key, "Idempotency key reused for a different submission");
                Err(ContactError::KeyReused)
            }
            Claim::Claimed => {
                let guard = self.ledger.guard(key);
                let submission_id = self.deliver(request).await?;
                guard.complete(&submission_id);
                Ok(ContactReceipt {
                    submission_id,
                    replayed: false,
                })
            }
        }
    }

    async fn deliver(&self, request: &ContactRequest) -> Result<String, ContactError> {
        let submission_id = uuid::Uuid::new_v4().to_string();
        let mail = request.to_mail(&self.to_address);

        match self.transport.send(&mail).await {
            Ok(()) => {
                tracing::info!(%submission_id, "Contact submission forwarded");
                Ok(submission_id)
            }
            Err(e) => {
                tracing::warn!(%submission_id, error = %e, "Contact submission failed");
                Err(e.into())
            }
        }
    }
}
