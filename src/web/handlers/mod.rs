//! API handlers for the relay.

pub mod contact;
pub mod index;
pub mod messages;

pub use contact::*;
pub use index::*;
pub use messages::*;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::chain::{DappSession, MarkerStore, MessageRegistry, WalletProvider};
use crate::config::Config;
use crate::mail::{ContactService, MailTransport};

/// Application state shared by all handlers.
pub struct AppState {
    /// Contact form relay.
    pub contact: ContactService,
    /// Registry client for listing messages, when the ledger is configured.
    pub registry: Option<Arc<MessageRegistry>>,
    /// Session used to relay mints, when enabled.
    pub session: Option<Mutex<DappSession>>,
}

impl AppState {
    /// Create a new application state with the ledger disabled.
    pub fn new(contact: ContactService) -> Self {
        Self {
            contact,
            registry: None,
            session: None,
        }
    }

    /// Attach a dapp session.
    ///
    /// Its registry serves `GET /messages`; the session itself is only kept
    /// when `relay_mint` is set.
    pub fn with_session(mut self, session: DappSession, relay_mint: bool) -> Self {
        self.registry = session.registry().cloned();
        if relay_mint {
            self.session = Some(Mutex::new(session));
        }
        self
    }

    /// Silently reconnect the relay session if the marker from a previous run is set.
    ///
    /// A failed reconnect is logged and leaves the session disconnected.
    pub async fn restore_session(&self) {
        let Some(session) = &self.session else {
            return;
        };

        let mut session = session.lock().await;
        match session.restore().await {
            Ok(state) => match &state.account {
                Some(account) => tracing::info!(%account, "Restored wallet session"),
                None => tracing::debug!("No wallet session to restore"),
            },
            Err(e) => tracing::warn!(error = %e, "Silent wallet reconnect failed"),
        }
    }

    /// Build the state described by `config`.
    pub fn from_config(
        config: &Config,
        transport: Arc<dyn MailTransport>,
        provider: Option<Arc<dyn WalletProvider>>,
        marker: Arc<dyn MarkerStore>,
    ) -> Self {
        let contact = ContactService::new(
            transport,
            config.smtp.to_address.clone(),
            Duration::from_secs(config.server.idempotency_window_secs),
        );
        let session = DappSession::from_parts(provider, &config.chain, marker);
        Self::new(contact).with_session(session, config.server.relay_mint)
    }
}
