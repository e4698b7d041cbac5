//! Headless dapp session: connection state plus the last fetched messages.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::marker::MarkerStore;
use super::provider::{JsonRpcProvider, ProviderError, WalletProvider};
use super::registry::{MessageRegistry, RegistryError};
use super::types::{ChainParameters, ConnectionState, Message, MintReceipt};
use super::wallet::{WalletConnector, WalletError};
use crate::config::ChainConfig;

/// Session errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// No registry contract is configured.
    #[error("message registry is not configured")]
    NotConfigured,

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Build the JSON-RPC provider described by `config`.
///
/// Returns `Ok(None)` when no RPC endpoint is configured.
pub fn provider_from_config(
    config: &ChainConfig,
) -> Result<Option<Arc<dyn WalletProvider>>, ProviderError> {
    if config.rpc_url.is_empty() {
        return Ok(None);
    }
    let provider = JsonRpcProvider::new(
        &config.rpc_url,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    Ok(Some(Arc::new(provider)))
}

/// Wallet connection and message list for one user.
pub struct DappSession {
    connector: WalletConnector,
    registry: Option<Arc<MessageRegistry>>,
    state: ConnectionState,
    messages: Vec<Message>,
}

impl DappSession {
    pub fn new(connector: WalletConnector, registry: Option<Arc<MessageRegistry>>) -> Self {
        Self {
            connector,
            registry,
            state: ConnectionState::disconnected(),
            messages: Vec::new(),
        }
    }

    /// Assemble a session from an optional provider and the chain settings.
    ///
    /// The registry is only available when both a provider and a contract
    /// address are present.
    pub fn from_parts(
        provider: Option<Arc<dyn WalletProvider>>,
        config: &ChainConfig,
        marker: Arc<dyn MarkerStore>,
    ) -> Self {
        let registry = provider
            .as_ref()
            .filter(|_| !config.contract_address.is_empty())
            .map(|p| Arc::new(MessageRegistry::new(p.clone(), config)));
        let connector = WalletConnector::new(provider, ChainParameters::from(config), marker);
        Self::new(connector, registry)
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// The last fetched message list.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn registry(&self) -> Option<&Arc<MessageRegistry>> {
        self.registry.as_ref()
    }

    pub fn connector(&self) -> &WalletConnector {
        &self.connector
    }

    /// Silently reconnect if a previous session left the marker set.
    pub async fn restore(&mut self) -> Result<&ConnectionState, SessionError> {
        if let Some(account) = self.connector.restore().await? {
            self.state = ConnectionState::connected(account);
            self.refresh_quietly().await;
        }
        Ok(&self.state)
    }

    /// Connect the wallet and fetch the message list.
    pub async fn connect(&mut self) -> Result<&ConnectionState, SessionError> {
        let account = self.connector.connect().await?;
        self.state = ConnectionState::connected(account);
        self.refresh_quietly().await;
        Ok(&self.state)
    }

    /// React to the wallet reporting a new account list.
    pub async fn on_accounts_changed(&mut self, accounts: &[String]) {
        match accounts.first() {
            None => self.on_disconnect(),
            Some(account) => {
                tracing::info!(%account, "Wallet account changed");
                self.state = ConnectionState::connected(account.clone());
                self.connector.remember();
                self.refresh_quietly().await;
            }
        }
    }

    /// React to the wallet disconnecting.
    pub fn on_disconnect(&mut self) {
        self.state = ConnectionState::disconnected();
        self.connector.disconnect();
    }

    /// Mint a message from the connected account, connecting first if needed.
    pub async fn mint(&mut self, author: &str, content: &str) -> Result<MintReceipt, SessionError> {
        let registry = self.registry.clone().ok_or(SessionError::NotConfigured)?;

        let account = match self.state.account.clone() {
            Some(account) if self.state.is_connected => account,
            _ => {
                self.connect().await?;
                self.state
                    .account
                    .clone()
                    .ok_or(WalletError::PermissionDenied)?
            }
        };

        let receipt = registry.submit(&account, author, content).await?;
        self.refresh_quietly().await;
        Ok(receipt)
    }

    /// Re-fetch the message list.
    pub async fn refresh(&mut self) -> Result<&[Message], SessionError> {
        let registry = self.registry.as_ref().ok_or(SessionError::NotConfigured)?;
        self.messages = registry.list().await?;
        Ok(&self.messages)
    }

    async fn refresh_quietly(&mut self) {
        if self.registry.is_none() {
            return;
        }
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "Failed to refresh messages");
        }
    }
}
