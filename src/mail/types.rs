//! Mail types.

/// A single outgoing message handed to a [`MailTransport`](super::MailTransport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    /// Recipient address.
    pub to: String,
    /// Address replies should go to, if different from the sender.
    pub reply_to: Option<String>,
    /// Mail subject.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

impl OutgoingMail {
    /// Create a new outgoing mail without a reply-to address.
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            reply_to: None,
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Set the reply-to address.
    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }
}
