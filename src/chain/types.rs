//! Message registry types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::ChainConfig;

/// A minted message as stored by the registry contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Message {
    /// Account that minted the message.
    pub from_address: String,
    /// Author name given at mint time.
    pub author: String,
    /// Message text.
    pub content: String,
    /// Token id assigned by the ledger.
    pub token_id: u64,
    /// Block timestamp of the mint, in seconds.
    pub timestamp_secs: u64,
}

/// Result of a confirmed mint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MintReceipt {
    /// Hash of the mint transaction.
    pub transaction_hash: String,
    /// Token id decoded from the mint event.
    pub token_id: u64,
    /// Account that received the token.
    pub owner: String,
}

/// Wallet connection state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionState {
    /// Whether an account is connected.
    pub is_connected: bool,
    /// The connected account.
    pub account: Option<String>,
}

impl ConnectionState {
    /// State for a connected account.
    pub fn connected(account: impl Into<String>) -> Self {
        Self {
            is_connected: true,
            account: Some(account.into()),
        }
    }

    /// State with no account.
    pub fn disconnected() -> Self {
        Self::default()
    }
}

/// Parameters of a `wallet_addEthereumChain` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainParameters {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_url: String,
    pub currency_name: String,
    pub currency_symbol: String,
    pub decimals: u8,
    pub explorer_url: String,
}

impl ChainParameters {
    /// The chain id as a `0x`-prefixed hex quantity.
    pub fn chain_id_hex(&self) -> String {
        format!("{:#x}", self.chain_id)
    }
}

impl From<&ChainConfig> for ChainParameters {
    fn from(config: &ChainConfig) -> Self {
        Self {
            chain_id: config.chain_id,
            chain_name: config.chain_name.clone(),
            rpc_url: config.rpc_url.clone(),
            currency_name: config.currency_name.clone(),
            currency_symbol: config.currency_symbol.clone(),
            decimals: config.decimals,
            explorer_url: config.explorer_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_hex() {
        let params = ChainParameters::from(&ChainConfig::default());
        assert_eq!(params.chain_id_hex(), "0x4268");
    }

    #[test]
    fn test_connection_state() {
        let state = ConnectionState::connected("0xabc");
        assert!(state.is_connected);
        assert_eq!(state.account.as_deref(), Some("0xabc"));
        assert_eq!(ConnectionState::disconnected(), ConnectionState::default());
    }

    #[test]
    fn test_message_serializes() {
        let message = Message {
            from_address: "0x70997970c51812dc3a010c7d01b50e0d17dc79c8".into(),
            author: "Ana".into(),
            content: "hello".into(),
            token_id: 1,
            timestamp_secs: 1_700_000_000,
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["author"], "Ana");
        assert_eq!(json["token_id"], 1);
    }
}
