//! orcapost - contact form relay and on-chain message registry client.
//!
//! The relay forwards contact form submissions by SMTP. The chain module
//! connects a wallet to the registry contract, mints messages and lists
//! them back.

pub mod chain;
pub mod config;
pub mod error;
pub mod logging;
pub mod mail;
pub mod web;

pub use chain::{
    DappSession, Message, MessageRegistry, MintReceipt, WalletConnector, WalletProvider,
};
pub use config::Config;
pub use error::{OrcaError, Result};
pub use mail::{ContactRequest, ContactService, MailTransport, SmtpMailer};
