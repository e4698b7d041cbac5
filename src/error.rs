//! Error types for orcapost.

use thiserror::Error;

use crate::chain::{ProviderError, RegistryError, SessionError, WalletError};
use crate::mail::{ContactError, MailError};

/// Common error type for orcapost.
#[derive(Error, Debug)]
pub enum OrcaError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Mail transport error.
    #[error(transparent)]
    Mail(#[from] MailError),

    /// Contact submission error.
    #[error(transparent)]
    Contact(#[from] ContactError),

    /// Wallet provider error.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Wallet connection error.
    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// Message registry error.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Dapp session error.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Result type alias for orcapost operations.
pub type Result<T> = std::result::Result<T, OrcaError>;
