//! SMTP transport adapter.
//!
//! One call opens an authenticated implicit-TLS session and sends exactly one
//! message. Failures are returned to the caller; nothing is retried or queued.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use thiserror::Error;

use super::types::OutgoingMail;
use crate::config::SmtpConfig;

/// Mail transport errors.
#[derive(Error, Debug)]
pub enum MailError {
    /// An address could not be parsed.
    #[error("invalid mail address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The message could not be assembled.
    #[error("failed to build message: {0}")]
    Build(String),

    /// The SMTP exchange failed.
    #[error("mail transport error: {0}")]
    Transport(String),
}

/// Something that can deliver an [`OutgoingMail`].
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver one message. At most one delivery attempt is made.
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

/// [`MailTransport`] backed by an SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Create a mailer from the SMTP configuration.
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let from = parse_mailbox(config.sender())?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.server)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { transport, from })
    }

    fn build_message(&self, mail: &OutgoingMail) -> Result<lettre::Message, MailError> {
        build_message(&self.from, mail)
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let message = self.build_message(mail)?;

        match self.transport.send(message).await {
            Ok(_) => {
                tracing::info!(to = %mail.to, subject = %mail.subject, "Email was sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(to = %mail.to, error = %e, "Email could not be sent");
                Err(MailError::Transport(e.to_string()))
            }
        }
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

fn build_message(from: &Mailbox, mail: &OutgoingMail) -> Result<lettre::Message, MailError> {
    let mut builder = lettre::Message::builder()
        .from(from.clone())
        .to(parse_mailbox(&mail.to)?)
        .subject(mail.subject.clone())
        .header(ContentType::TEXT_PLAIN);

    if let Some(reply_to) = &mail.reply_to {
        builder = builder.reply_to(parse_mailbox(reply_to)?);
    }

    builder
        .body(mail.body.clone())
        .map_err(|e| MailError::Build(e.to_string()))
}
