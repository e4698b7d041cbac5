//! Mail module for orcapost.
//!
//! This module provides the contact-form relay:
//! - SMTP delivery of a single message per call
//! - Contact submission validation and forwarding
//! - Optional idempotency keys to suppress duplicate deliveries

mod contact;
mod idempotency;
mod transport;
mod types;

pub use contact::{ContactError, ContactReceipt, ContactRequest, ContactService};
pub use idempotency::{Claim, IdempotencyLedger, KeyGuard, DEFAULT_IN_FLIGHT_TIMEOUT};
pub use transport::{MailError, MailTransport, SmtpMailer};
pub use types::OutgoingMail;
