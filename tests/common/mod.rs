//! Test helpers for relay integration tests.
//!
//! Provides a recording mail transport, an in-memory ledger standing in for
//! the wallet provider, and a router factory wiring them together.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum_test::TestServer;

use orcapost::chain::abi;
use orcapost::chain::{
    CallRequest, ChainParameters, DappSession, Log, MemoryMarkerStore, Message, ProviderError,
    TransactionReceipt, TransactionRequest, WalletProvider, EMPTY_CONTENT_REASON,
    UNRECOGNIZED_CHAIN,
};
use orcapost::config::ChainConfig;
use orcapost::mail::{ContactService, MailError, MailTransport, OutgoingMail};
use orcapost::web::middleware::RateLimitState;
use orcapost::web::{create_router, AppState};

pub const OWNER: &str = "owner@example.com";
pub const CONTRACT: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
pub const ACCOUNT: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";
pub const HOLESKY: u64 = 17000;

/// Mail transport that records every message it is asked to send.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<OutgoingMail>>,
    fail: Mutex<bool>,
    delay: Option<Duration>,
}

impl RecordingTransport {
    pub fn failing() -> Self {
        Self {
            fail: Mutex::new(true),
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.sent.lock().unwrap().push(mail.clone());
        if *self.fail.lock().unwrap() {
            return Err(MailError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

/// In-memory registry contract behind a node-managed account.
pub struct LedgerDouble {
    pub chain_id: u64,
    /// Whether the wallet knows the target chain.
    pub knows_target: bool,
    pub messages: Mutex<Vec<Message>>,
    receipts: Mutex<Vec<TransactionReceipt>>,
    pub request_calls: Mutex<u32>,
    pub switch_calls: Mutex<u32>,
    pub add_calls: Mutex<u32>,
}

impl Default for LedgerDouble {
    fn default() -> Self {
        Self::on_chain(HOLESKY)
    }
}

impl LedgerDouble {
    pub fn on_chain(chain_id: u64) -> Self {
        Self {
            chain_id,
            knows_target: true,
            messages: Mutex::new(Vec::new()),
            receipts: Mutex::new(Vec::new()),
            request_calls: Mutex::new(0),
            switch_calls: Mutex::new(0),
            add_calls: Mutex::new(0),
        }
    }

    pub fn with_messages(messages: Vec<Message>) -> Self {
        let ledger = Self::default();
        *ledger.messages.lock().unwrap() = messages;
        ledger
    }
}

/// Decode the two string arguments of a `safeMint` call.
fn decode_mint_args(data: &str) -> (String, String) {
    let bytes = abi::from_hex(data).unwrap();
    let args = &bytes[4..];
    let read = |slot: usize| {
        let offset = abi::word_to_u64(&args[slot * 32..slot * 32 + 32]).unwrap() as usize;
        let len = abi::word_to_u64(&args[offset..offset + 32]).unwrap() as usize;
        String::from_utf8(args[offset + 32..offset + 32 + len].to_vec()).unwrap()
    };
    (read(0), read(1))
}

fn topic(word: [u8; 32]) -> String {
    abi::to_hex(&word)
}

#[async_trait]
impl WalletProvider for LedgerDouble {
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError> {
        *self.request_calls.lock().unwrap() += 1;
        Ok(vec![ACCOUNT.to_string()])
    }

    async fn accounts(&self) -> Result<Vec<String>, ProviderError> {
        Ok(vec![])
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        Ok(self.chain_id)
    }

    async fn switch_chain(&self, _chain_id: u64) -> Result<(), ProviderError> {
        *self.switch_calls.lock().unwrap() += 1;
        if self.knows_target {
            Ok(())
        } else {
            Err(ProviderError::rpc(UNRECOGNIZED_CHAIN, "Unrecognized chain ID"))
        }
    }

    async fn add_chain(&self, _params: &ChainParameters) -> Result<(), ProviderError> {
        *self.add_calls.lock().unwrap() += 1;
        Err(ProviderError::rpc(4001, "User rejected the request."))
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, ProviderError> {
        let (author, content) = decode_mint_args(&tx.data);
        if content.is_empty() {
            return Err(ProviderError::Rpc {
                code: -32603,
                message: "Internal JSON-RPC error.".to_string(),
                data: Some(serde_json::Value::String(abi::to_hex(
                    &abi::encode_revert_reason(EMPTY_CONTENT_REASON),
                ))),
            });
        }

        let mut messages = self.messages.lock().unwrap();
        let token_id = messages.len() as u64;
        messages.push(Message {
            from_address: tx.from.clone(),
            author,
            content,
            token_id,
            timestamp_secs: 1_714_000_000 + token_id * 12,
        });

        let hash = format!("0x{:064x}", token_id + 1);
        self.receipts.lock().unwrap().push(TransactionReceipt {
            transaction_hash: hash.clone(),
            status: Some("0x1".to_string()),
            logs: vec![Log {
                address: tx.to.clone(),
                topics: vec![
                    abi::TRANSFER_TOPIC.to_string(),
                    topic([0u8; 32]),
                    topic(abi::address_to_word(&tx.from).unwrap()),
                    topic(abi::u64_to_word(token_id)),
                ],
                data: "0x".to_string(),
            }],
        });
        Ok(hash)
    }

    async fn transaction_receipt(
        &self,
        hash: &str,
    ) -> Result<Option<TransactionReceipt>, ProviderError> {
        Ok(self
            .receipts
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.transaction_hash == hash)
            .cloned())
    }

    async fn call(&self, _call: &CallRequest) -> Result<Vec<u8>, ProviderError> {
        abi::encode_messages(&self.messages.lock().unwrap())
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

/// Chain settings pointing at the test contract.
pub fn chain_config() -> ChainConfig {
    ChainConfig {
        contract_address: CONTRACT.to_string(),
        rpc_url: "http://127.0.0.1:8545".to_string(),
        receipt_poll_interval_ms: 0,
        receipt_poll_attempts: 3,
        ..ChainConfig::default()
    }
}

/// Options for building a test server.
pub struct TestSetup {
    pub transport: Arc<RecordingTransport>,
    pub ledger: Option<Arc<LedgerDouble>>,
    pub relay_mint: bool,
    pub rate_limit: u32,
    /// Whether a previous run left the "was connected" marker set.
    pub was_connected: bool,
}

impl Default for TestSetup {
    fn default() -> Self {
        Self {
            transport: Arc::new(RecordingTransport::default()),
            ledger: None,
            relay_mint: false,
            rate_limit: 1000,
            was_connected: false,
        }
    }
}

impl TestSetup {
    /// Build the app state for this setup.
    pub fn app_state(&self) -> AppState {
        let contact = ContactService::new(
            self.transport.clone(),
            OWNER,
            Duration::from_secs(3600),
        );
        let state = AppState::new(contact);

        match &self.ledger {
            Some(ledger) => {
                let provider: Arc<dyn WalletProvider> = ledger.clone();
                let session = DappSession::from_parts(
                    Some(provider),
                    &chain_config(),
                    Arc::new(MemoryMarkerStore::new(self.was_connected)),
                );
                state.with_session(session, self.relay_mint)
            }
            None => state,
        }
    }

    /// Create a test server for this setup.
    pub fn server(&self) -> TestServer {
        self.server_for(self.app_state())
    }

    /// Create a test server after the startup session restore has run.
    pub async fn restored_server(&self) -> TestServer {
        let state = self.app_state();
        state.restore_session().await;
        self.server_for(state)
    }

    fn server_for(&self, state: AppState) -> TestServer {
        let router = create_router(
            Arc::new(state),
            Arc::new(RateLimitState::new(self.rate_limit)),
            &[],
        );
        TestServer::new(router).expect("Failed to create test server")
    }
}

/// Create a test server with a recording transport and no ledger.
pub fn create_test_server() -> (TestServer, Arc<RecordingTransport>) {
    let setup = TestSetup::default();
    (setup.server(), setup.transport.clone())
}
