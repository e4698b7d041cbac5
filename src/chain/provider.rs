//! Wallet provider abstraction.
//!
//! [`WalletProvider`] mirrors the EIP-1193 surface the registry client needs.
//! [`JsonRpcProvider`] implements it over Ethereum JSON-RPC with `reqwest`,
//! which works against any node exposing managed accounts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use super::abi;
use super::types::ChainParameters;
use crate::config::validate_url;

/// EIP-1193 "user rejected the request".
pub const USER_REJECTED: i64 = 4001;

/// EIP-3326 "unrecognized chain id".
pub const UNRECOGNIZED_CHAIN: i64 = 4902;

/// User agent string for JSON-RPC requests.
const USER_AGENT: &str = concat!("orcapost/", env!("CARGO_PKG_VERSION"));

/// Provider errors.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// The provider answered with a JSON-RPC error.
    #[error("provider error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    /// The request could not be delivered.
    #[error("provider transport error: {0}")]
    Transport(String),

    /// The provider answered with something unexpected.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Create an RPC error without data.
    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        Self::Rpc {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// The JSON-RPC error code, if any.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The revert reason carried by this error, if the ledger rejected a call.
    ///
    /// Looks for `Error(string)` revert data first (as a hex string or nested
    /// under `data`), then falls back to the reason quoted in the message.
    pub fn revert_reason(&self) -> Option<String> {
        let Self::Rpc { message, data, .. } = self else {
            return None;
        };

        if let Some(reason) = data.as_ref().and_then(revert_data).and_then(|bytes| {
            abi::decode_revert_reason(&bytes)
        }) {
            return Some(reason);
        }

        if let Some(rest) = message.split("reverted with reason string '").nth(1) {
            return rest.split('\'').next().map(str::to_string);
        }
        message
            .split("execution reverted: ")
            .nth(1)
            .map(|reason| reason.trim().to_string())
    }
}

fn revert_data(data: &Value) -> Option<Vec<u8>> {
    match data {
        Value::String(hex) => abi::from_hex(hex).ok(),
        Value::Object(map) => map.get("data").and_then(revert_data),
        _ => None,
    }
}

/// A transaction to be signed and sent by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRequest {
    pub from: String,
    pub to: String,
    /// `0x`-prefixed calldata.
    pub data: String,
}

/// A read-only call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallRequest {
    pub to: String,
    /// `0x`-prefixed calldata.
    pub data: String,
}

/// A log entry in a transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Log {
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub data: String,
}

/// The parts of a transaction receipt the client reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    /// `0x1` on success, `0x0` on revert. Absent on pre-Byzantium chains.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub logs: Vec<Log>,
}

impl TransactionReceipt {
    /// Whether the receipt reports a reverted transaction.
    pub fn is_reverted(&self) -> bool {
        matches!(self.status.as_deref(), Some("0x0") | Some("0x00"))
    }
}

/// The wallet and ledger operations the registry client depends on.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask the user to authorize accounts (`eth_requestAccounts`).
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError>;

    /// Accounts already authorized, without prompting (`eth_accounts`).
    async fn accounts(&self) -> Result<Vec<String>, ProviderError>;

    /// The active chain id (`eth_chainId`).
    async fn chain_id(&self) -> Result<u64, ProviderError>;

    /// Switch the active chain (`wallet_switchEthereumChain`).
    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError>;

    /// Register a chain with the wallet (`wallet_addEthereumChain`).
    async fn add_chain(&self, params: &ChainParameters) -> Result<(), ProviderError>;

    /// Sign and send a transaction, returning its hash (`eth_sendTransaction`).
    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, ProviderError>;

    /// The receipt of a transaction, or `None` while pending.
    async fn transaction_receipt(
        &self,
        hash: &str,
    ) -> Result<Option<TransactionReceipt>, ProviderError>;

    /// Execute a read-only call against the latest block (`eth_call`).
    async fn call(&self, call: &CallRequest) -> Result<Vec<u8>, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// [`WalletProvider`] speaking JSON-RPC over HTTP.
pub struct JsonRpcProvider {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcProvider {
    /// Create a provider for the endpoint at `url`.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        if !validate_url(url) {
            return Err(ProviderError::Transport(format!("invalid RPC URL: {url}")));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    /// The endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        tracing::debug!(method, id, "JSON-RPC request");

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(format!("{method}: {e}")))?;

        if !response.status().is_success() {
            return Err(ProviderError::Transport(format!(
                "{method}: HTTP {}",
                response.status()
            )));
        }

        let response: RpcResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("{method}: {e}")))?;

        if let Some(error) = response.error {
            tracing::debug!(method, code = error.code, message = %error.message, "JSON-RPC error");
            return Err(ProviderError::Rpc {
                code: error.code,
                message: error.message,
                data: error.data,
            });
        }

        serde_json::from_value(response.result.unwrap_or(Value::Null))
            .map_err(|e| ProviderError::InvalidResponse(format!("{method}: {e}")))
    }
}

/// Parse a `0x` hex quantity.
pub fn parse_quantity(value: &str) -> Result<u64, ProviderError> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| ProviderError::InvalidResponse(format!("not a hex quantity: {value}")))?;
    u64::from_str_radix(digits, 16)
        .map_err(|_| ProviderError::InvalidResponse(format!("not a hex quantity: {value}")))
}

#[async_trait]
impl WalletProvider for JsonRpcProvider {
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError> {
        self.request("eth_requestAccounts", json!([])).await
    }

    async fn accounts(&self) -> Result<Vec<String>, ProviderError> {
        self.request("eth_accounts", json!([])).await
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        let id: String = self.request("eth_chainId", json!([])).await?;
        parse_quantity(&id)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        let _: Value = self
            .request(
                "wallet_switchEthereumChain",
                json!([{ "chainId": format!("{chain_id:#x}") }]),
            )
            .await?;
        Ok(())
    }

    async fn add_chain(&self, params: &ChainParameters) -> Result<(), ProviderError> {
        let _: Value = self
            .request(
                "wallet_addEthereumChain",
                json!([{
                    "chainId": params.chain_id_hex(),
                    "chainName": params.chain_name,
                    "rpcUrls": [params.rpc_url],
                    "nativeCurrency": {
                        "name": params.currency_name,
                        "symbol": params.currency_symbol,
                        "decimals": params.decimals,
                    },
                    "blockExplorerUrls": [params.explorer_url],
                }]),
            )
            .await?;
        Ok(())
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, ProviderError> {
        self.request("eth_sendTransaction", json!([tx])).await
    }

    async fn transaction_receipt(
        &self,
        hash: &str,
    ) -> Result<Option<TransactionReceipt>, ProviderError> {
        self.request("eth_getTransactionReceipt", json!([hash])).await
    }

    async fn call(&self, call: &CallRequest) -> Result<Vec<u8>, ProviderError> {
        let data: String = self.request("eth_call", json!([call, "latest"])).await?;
        abi::from_hex(&data).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x4268").unwrap(), 17000);
        assert_eq!(parse_quantity("0x1").unwrap(), 1);
        assert!(parse_quantity("17000").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_revert_reason_from_hex_data() {
        let data = abi::to_hex(&abi::encode_revert_reason("Empty messages are not allowed"));
        let err = ProviderError::Rpc {
            code: -32603,
            message: "Internal JSON-RPC error.".into(),
            data: Some(Value::String(data)),
        };
        assert_eq!(
            err.revert_reason().as_deref(),
            Some("Empty messages are not allowed")
        );
    }

    #[test]
    fn test_revert_reason_from_nested_data() {
        let data = abi::to_hex(&abi::encode_revert_reason("nope"));
        let err = ProviderError::Rpc {
            code: -32603,
            message: "Internal JSON-RPC error.".into(),
            data: Some(json!({ "message": "execution reverted", "data": data })),
        };
        assert_eq!(err.revert_reason().as_deref(), Some("nope"));
    }

    #[test]
    fn test_revert_reason_from_message() {
        let err = ProviderError::rpc(
            -32603,
            "Error: VM Exception while processing transaction: reverted with reason string 'Empty messages are not allowed'",
        );
        assert_eq!(
            err.revert_reason().as_deref(),
            Some("Empty messages are not allowed")
        );

        let err = ProviderError::rpc(3, "execution reverted: Empty messages are not allowed");
        assert_eq!(
            err.revert_reason().as_deref(),
            Some("Empty messages are not allowed")
        );
    }

    #[test]
    fn test_revert_reason_absent() {
        assert_eq!(ProviderError::rpc(USER_REJECTED, "User rejected").revert_reason(), None);
        assert_eq!(ProviderError::Transport("timeout".into()).revert_reason(), None);
    }

    #[test]
    fn test_receipt_deserializes() {
        let receipt: TransactionReceipt = serde_json::from_value(json!({
            "transactionHash": "0xabc",
            "status": "0x1",
            "blockNumber": "0x10",
            "logs": [{
                "address": "0x5fbdb2315678afecb367f032d93f642f64180aa3",
                "topics": [abi::TRANSFER_TOPIC],
                "data": "0x",
                "logIndex": "0x0"
            }]
        }))
        .unwrap();
        assert_eq!(receipt.transaction_hash, "0xabc");
        assert!(!receipt.is_reverted());
        assert_eq!(receipt.logs.len(), 1);
    }

    #[test]
    fn test_receipt_reverted() {
        let receipt: TransactionReceipt = serde_json::from_value(json!({
            "transactionHash": "0xabc",
            "status": "0x0",
            "logs": []
        }))
        .unwrap();
        assert!(receipt.is_reverted());
    }

    #[test]
    fn test_json_rpc_provider_rejects_bad_url() {
        assert!(JsonRpcProvider::new("not a url", Duration::from_secs(5)).is_err());
        assert!(JsonRpcProvider::new("http://127.0.0.1:8545", Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_transaction_request_serializes() {
        let tx = TransactionRequest {
            from: "0xfrom".into(),
            to: "0xto".into(),
            data: "0x1234".into(),
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json, json!({ "from": "0xfrom", "to": "0xto", "data": "0x1234" }));
    }
}
