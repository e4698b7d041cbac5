//! Message registry contract client.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::abi::{self, AbiError};
use super::provider::{
    CallRequest, ProviderError, TransactionReceipt, TransactionRequest, WalletProvider,
};
use super::types::{Message, MintReceipt};
use crate::config::ChainConfig;

/// Revert reason the contract gives for an empty message.
pub const EMPTY_CONTENT_REASON: &str = "Empty messages are not allowed";

/// Registry client errors.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The ledger refused an empty message.
    #[error("ledger rejected the message: {0}")]
    EmptyContent(String),

    /// The ledger rejected the transaction.
    #[error("transaction reverted: {0}")]
    Reverted(String),

    /// The transaction succeeded but emitted no mint event.
    #[error("mint event not found in transaction {0}")]
    EventNotFound(String),

    /// No receipt arrived within the polling budget.
    #[error("transaction {0} was not confirmed in time")]
    ConfirmationTimeout(String),

    #[error("ABI error: {0}")]
    Abi(#[from] AbiError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl RegistryError {
    /// Classify a provider failure, surfacing ledger rejections by reason.
    fn from_provider(e: ProviderError) -> Self {
        match e.revert_reason() {
            Some(reason) if reason == EMPTY_CONTENT_REASON => Self::EmptyContent(reason),
            Some(reason) => Self::Reverted(reason),
            None => Self::Provider(e),
        }
    }
}

/// Client for the message registry contract.
pub struct MessageRegistry {
    provider: Arc<dyn WalletProvider>,
    contract: String,
    poll_interval: Duration,
    poll_attempts: u32,
}

impl MessageRegistry {
    pub fn new(provider: Arc<dyn WalletProvider>, config: &ChainConfig) -> Self {
        Self {
            provider,
            contract: config.contract_address.clone(),
            poll_interval: Duration::from_millis(config.receipt_poll_interval_ms),
            poll_attempts: config.receipt_poll_attempts.max(1),
        }
    }

    /// Address of the registry contract.
    pub fn contract_address(&self) -> &str {
        &self.contract
    }

    /// Mint a message from `from` and wait for the mint event.
    ///
    /// Content is passed to the ledger as-is; the contract decides what it
    /// accepts.
    pub async fn submit(
        &self,
        from: &str,
        author: &str,
        content: &str,
    ) -> Result<MintReceipt, RegistryError> {
        let data = abi::encode_call(abi::SAFE_MINT_SIGNATURE, &[author, content]);
        let tx = TransactionRequest {
            from: from.to_string(),
            to: self.contract.clone(),
            data: abi::to_hex(&data),
        };

        let hash = self
            .provider
            .send_transaction(&tx)
            .await
            .map_err(RegistryError::from_provider)?;
        tracing::info!(%hash, %from, "Mint transaction submitted");

        let receipt = self.wait_for_receipt(&hash).await?;
        if receipt.is_reverted() {
            tracing::warn!(%hash, "Mint transaction reverted");
            return Err(RegistryError::Reverted(format!(
                "transaction {hash} failed"
            )));
        }

        let (token_id, owner) = self
            .find_mint(&receipt)?
            .ok_or_else(|| RegistryError::EventNotFound(hash.clone()))?;

        tracing::info!(%hash, token_id, "Message minted");
        Ok(MintReceipt {
            transaction_hash: hash,
            token_id,
            owner,
        })
    }

    /// All stored messages in ledger order.
    pub async fn list(&self) -> Result<Vec<Message>, RegistryError> {
        let call = CallRequest {
            to: self.contract.clone(),
            data: abi::to_hex(&abi::encode_call(abi::GET_MESSAGES_SIGNATURE, &[])),
        };
        let raw = self.provider.call(&call).await?;
        let messages = abi::decode_messages(&raw)?;
        tracing::debug!(count = messages.len(), "Fetched messages");
        Ok(messages)
    }

    async fn wait_for_receipt(&self, hash: &str) -> Result<TransactionReceipt, RegistryError> {
        for attempt in 1..=self.poll_attempts {
            if let Some(receipt) = self.provider.transaction_receipt(hash).await? {
                return Ok(receipt);
            }
            if attempt < self.poll_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }
        tracing::warn!(%hash, attempts = self.poll_attempts, "Gave up waiting for receipt");
        Err(RegistryError::ConfirmationTimeout(hash.to_string()))
    }

    /// Token id and owner from the first Transfer log minted by the contract.
    fn find_mint(&self, receipt: &TransactionReceipt) -> Result<Option<(u64, String)>, AbiError> {
        for log in &receipt.logs {
            if !abi::hex_eq(&log.address, &self.contract) || log.topics.len() != 4 {
                continue;
            }
            if !abi::hex_eq(&log.topics[0], abi::TRANSFER_TOPIC) {
                continue;
            }
            let from = abi::from_hex(&log.topics[1])?;
            if from.iter().any(|b| *b != 0) {
                continue;
            }
            let owner = abi::word_to_address(&abi::from_hex(&log.topics[2])?);
            let token_id = abi::word_to_u64(&abi::from_hex(&log.topics[3])?)?;
            return Ok(Some((token_id, owner)));
        }
        Ok(None)
    }
}
