//! Wallet connection and network reconciliation.

use std::sync::Arc;

use thiserror::Error;

use super::marker::MarkerStore;
use super::provider::{ProviderError, WalletProvider, UNRECOGNIZED_CHAIN, USER_REJECTED};
use super::types::ChainParameters;

/// Wallet connection errors.
#[derive(Error, Debug)]
pub enum WalletError {
    /// No wallet provider is available.
    #[error("no wallet provider is available")]
    ProviderMissing,

    /// The user refused to authorize an account.
    #[error("wallet authorization was denied")]
    PermissionDenied,

    /// The wallet could not be moved to the required chain.
    #[error("wallet is on chain {actual}, expected chain {expected}")]
    NetworkMismatch { expected: u64, actual: u64 },

    /// The provider failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Obtains an authorized account on the required chain.
pub struct WalletConnector {
    provider: Option<Arc<dyn WalletProvider>>,
    chain: ChainParameters,
    marker: Arc<dyn MarkerStore>,
}

impl WalletConnector {
    /// Create a connector. `provider` is `None` when no wallet is available.
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        chain: ChainParameters,
        marker: Arc<dyn MarkerStore>,
    ) -> Self {
        Self {
            provider,
            chain,
            marker,
        }
    }

    /// The provider, or [`WalletError::ProviderMissing`].
    pub fn provider(&self) -> Result<&Arc<dyn WalletProvider>, WalletError> {
        self.provider.as_ref().ok_or(WalletError::ProviderMissing)
    }

    /// The chain the wallet must be on.
    pub fn chain(&self) -> &ChainParameters {
        &self.chain
    }

    /// Whether the "was connected" marker is set.
    pub fn was_connected(&self) -> bool {
        self.marker.was_connected()
    }

    /// Request an account and make sure the wallet is on the required chain.
    ///
    /// Returns the primary authorized account and sets the "was connected"
    /// marker.
    pub async fn connect(&self) -> Result<String, WalletError> {
        let provider = self.provider()?;

        let accounts = provider.request_accounts().await.map_err(|e| {
            if e.code() == Some(USER_REJECTED) {
                WalletError::PermissionDenied
            } else {
                WalletError::Provider(e)
            }
        })?;
        let account = accounts
            .into_iter()
            .next()
            .ok_or(WalletError::PermissionDenied)?;

        self.ensure_chain(provider.as_ref()).await?;

        self.remember();
        tracing::info!(%account, chain_id = self.chain.chain_id, "Wallet connected");
        Ok(account)
    }

    /// Reconnect without prompting when possible.
    ///
    /// An already-authorized account is adopted directly. Otherwise, if the
    /// marker says a wallet was connected before, a full [`connect`] is
    /// attempted; a failure there clears the marker. Returns `Ok(None)` when
    /// there is nothing to restore.
    ///
    /// [`connect`]: WalletConnector::connect
    pub async fn restore(&self) -> Result<Option<String>, WalletError> {
        let Some(provider) = &self.provider else {
            return Ok(None);
        };

        if let Some(account) = provider.accounts().await?.into_iter().next() {
            self.remember();
            return Ok(Some(account));
        }

        if !self.marker.was_connected() {
            return Ok(None);
        }

        tracing::info!("Attempting silent wallet reconnect");
        match self.connect().await {
            Ok(account) => Ok(Some(account)),
            Err(e) => {
                self.forget();
                Err(e)
            }
        }
    }

    /// Clear the "was connected" marker.
    pub fn disconnect(&self) {
        self.forget();
        tracing::info!("Wallet disconnected");
    }

    pub(crate) fn remember(&self) {
        if let Err(e) = self.marker.remember() {
            tracing::warn!(error = %e, "Failed to persist wallet marker");
        }
    }

    fn forget(&self) {
        if let Err(e) = self.marker.forget() {
            tracing::warn!(error = %e, "Failed to clear wallet marker");
        }
    }

    async fn ensure_chain(&self, provider: &dyn WalletProvider) -> Result<(), WalletError> {
        let expected = self.chain.chain_id;
        let actual = provider.chain_id().await?;
        if actual == expected {
            return Ok(());
        }

        tracing::info!(actual, expected, "Switching wallet network");
        let mismatch = |e: ProviderError| match e {
            ProviderError::Rpc { .. } => {
                tracing::warn!(error = %e, expected, actual, "Network switch refused");
                WalletError::NetworkMismatch { expected, actual }
            }
            other => WalletError::Provider(other),
        };

        match provider.switch_chain(expected).await {
            Ok(()) => Ok(()),
            Err(e) if e.code() == Some(UNRECOGNIZED_CHAIN) => {
                tracing::info!(chain_id = expected, "Registering chain with wallet");
                provider.add_chain(&self.chain).await.map_err(mismatch)?;
                provider.switch_chain(expected).await.map_err(mismatch)
            }
            Err(e) => Err(mismatch(e)),
        }
    }
}
