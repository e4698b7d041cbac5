//! Ledger side of orcapost.
//!
//! This module provides the message registry client:
//! - Wallet connection with network switch/registration
//! - Minting messages and decoding the mint event
//! - Listing stored messages
//! - A headless session tying connection state to the message list

pub mod abi;
mod marker;
mod provider;
mod registry;
mod session;
mod types;
mod wallet;

pub use marker::{FileMarkerStore, MarkerStore, MemoryMarkerStore};
pub use provider::{
    parse_quantity, CallRequest, JsonRpcProvider, Log, ProviderError, TransactionReceipt,
    TransactionRequest, WalletProvider, UNRECOGNIZED_CHAIN, USER_REJECTED,
};
pub use registry::{MessageRegistry, RegistryError, EMPTY_CONTENT_REASON};
pub use session::{provider_from_config, DappSession, SessionError};
pub use types::{ChainParameters, ConnectionState, Message, MintReceipt};
pub use wallet::{WalletConnector, WalletError};
