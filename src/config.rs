//! Configuration module for orcapost.

use serde::Deserialize;
use std::path::Path;

use crate::{OrcaError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Contact submissions allowed per client IP per minute.
    #[serde(default = "default_contact_rate_limit")]
    pub contact_rate_limit: u32,
    /// How long a successful `Idempotency-Key` is remembered, in seconds.
    #[serde(default = "default_idempotency_window")]
    pub idempotency_window_secs: u64,
    /// Whether `POST /mint` relays mints through the node-managed account.
    #[serde(default)]
    pub relay_mint: bool,
    /// Take the client IP from `X-Forwarded-For` / `X-Real-IP`.
    /// Only enable behind a reverse proxy that overwrites these headers.
    #[serde(default)]
    pub trust_proxy_headers: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_contact_rate_limit() -> u32 {
    10
}

fn default_idempotency_window() -> u64 {
    86400 // 24 hours
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
            contact_rate_limit: default_contact_rate_limit(),
            idempotency_window_secs: default_idempotency_window(),
            relay_mint: false,
            trust_proxy_headers: false,
        }
    }
}

/// SMTP transport configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    /// SMTP relay host.
    #[serde(default)]
    pub server: String,
    /// SMTP relay port (implicit TLS).
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// Login user name.
    #[serde(default)]
    pub username: String,
    /// Login password.
    #[serde(default)]
    pub password: String,
    /// Destination address for contact submissions.
    #[serde(default)]
    pub to_address: String,
    /// Explicit sender address. Falls back to `username` when empty.
    #[serde(default)]
    pub from_address: String,
}

fn default_smtp_port() -> u16 {
    465
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            to_address: String::new(),
            from_address: String::new(),
        }
    }
}

impl SmtpConfig {
    /// The address used in the `From` header.
    pub fn sender(&self) -> &str {
        if self.from_address.is_empty() {
            &self.username
        } else {
            &self.from_address
        }
    }
}

/// Ledger configuration for the message registry.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// Address of the deployed registry contract.
    #[serde(default)]
    pub contract_address: String,
    /// Chain the wallet must be on.
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// Human-readable chain name used when registering the chain.
    #[serde(default = "default_chain_name")]
    pub chain_name: String,
    /// JSON-RPC endpoint. Empty disables the ledger features.
    #[serde(default)]
    pub rpc_url: String,
    /// Native currency name.
    #[serde(default = "default_currency_name")]
    pub currency_name: String,
    /// Native currency symbol.
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    /// Native currency decimals.
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    /// Block explorer base URL.
    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,
    /// Delay between receipt polls in milliseconds.
    #[serde(default = "default_receipt_poll_interval")]
    pub receipt_poll_interval_ms: u64,
    /// Maximum number of receipt polls before giving up.
    #[serde(default = "default_receipt_poll_attempts")]
    pub receipt_poll_attempts: u32,
    /// JSON-RPC request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Path of the "was connected" marker file.
    #[serde(default = "default_marker_path")]
    pub marker_path: String,
}

fn default_chain_id() -> u64 {
    17000 // Holesky
}

fn default_chain_name() -> String {
    "Holesky".to_string()
}

fn default_currency_name() -> String {
    "Holesky Ether".to_string()
}

fn default_currency_symbol() -> String {
    "ETH".to_string()
}

fn default_decimals() -> u8 {
    18
}

fn default_explorer_url() -> String {
    "https://holesky.etherscan.io".to_string()
}

fn default_receipt_poll_interval() -> u64 {
    1000
}

fn default_receipt_poll_attempts() -> u32 {
    120
}

fn default_request_timeout() -> u64 {
    30
}

fn default_marker_path() -> String {
    "data/wallet_connected.json".to_string()
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            contract_address: String::new(),
            chain_id: default_chain_id(),
            chain_name: default_chain_name(),
            rpc_url: String::new(),
            currency_name: default_currency_name(),
            currency_symbol: default_currency_symbol(),
            decimals: default_decimals(),
            explorer_url: default_explorer_url(),
            receipt_poll_interval_ms: default_receipt_poll_interval(),
            receipt_poll_attempts: default_receipt_poll_attempts(),
            request_timeout_secs: default_request_timeout(),
            marker_path: default_marker_path(),
        }
    }
}

impl ChainConfig {
    /// Whether both an RPC endpoint and a contract address are set.
    pub fn is_configured(&self) -> bool {
        !self.rpc_url.is_empty() && !self.contract_address.is_empty()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/orcapost.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// SMTP configuration.
    #[serde(default)]
    pub smtp: SmtpConfig,
    /// Ledger configuration.
    #[serde(default)]
    pub chain: ChainConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(OrcaError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| OrcaError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `PORT`
    /// - `TO_ADDRESS`
    /// - `SMTP_SERVER`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`
    /// - `CONTRACT_ADDRESS` (or `REACT_APP_CONTRACT_ADDRESS`)
    /// - `CHAIN_ID` (or `REACT_APP_CHAIN_ID`)
    /// - `RPC_URL`
    ///
    /// Empty values are ignored. Numeric values that fail to parse are an error.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(port) = env_value(&["PORT"]) {
            self.server.port = parse_number("PORT", &port)?;
        }
        if let Some(to) = env_value(&["TO_ADDRESS"]) {
            self.smtp.to_address = to;
        }
        if let Some(server) = env_value(&["SMTP_SERVER"]) {
            self.smtp.server = server;
        }
        if let Some(port) = env_value(&["SMTP_PORT"]) {
            self.smtp.port = parse_number("SMTP_PORT", &port)?;
        }
        if let Some(username) = env_value(&["SMTP_USERNAME"]) {
            self.smtp.username = username;
        }
        if let Some(password) = env_value(&["SMTP_PASSWORD"]) {
            self.smtp.password = password;
        }
        if let Some(address) = env_value(&["CONTRACT_ADDRESS", "REACT_APP_CONTRACT_ADDRESS"]) {
            self.chain.contract_address = address;
        }
        if let Some(chain_id) = env_value(&["CHAIN_ID", "REACT_APP_CHAIN_ID"]) {
            self.chain.chain_id = parse_number("CHAIN_ID", &chain_id)?;
        }
        if let Some(rpc_url) = env_value(&["RPC_URL"]) {
            self.chain.rpc_url = rpc_url;
        }
        Ok(())
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - SMTP server, credentials or destination are missing
    /// - the RPC URL is set but is not an http(s) URL
    /// - the RPC URL is set without a contract address
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.smtp.server.is_empty() {
            missing.push("smtp.server (SMTP_SERVER)");
        }
        if self.smtp.username.is_empty() {
            missing.push("smtp.username (SMTP_USERNAME)");
        }
        if self.smtp.password.is_empty() {
            missing.push("smtp.password (SMTP_PASSWORD)");
        }
        if self.smtp.to_address.is_empty() {
            missing.push("smtp.to_address (TO_ADDRESS)");
        }
        if !missing.is_empty() {
            return Err(OrcaError::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        if !self.chain.rpc_url.is_empty() {
            if !validate_url(&self.chain.rpc_url) {
                return Err(OrcaError::Config(format!(
                    "invalid RPC URL: {}",
                    self.chain.rpc_url
                )));
            }
            if self.chain.contract_address.is_empty() {
                return Err(OrcaError::Config(
                    "chain.rpc_url is set but chain.contract_address is not".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// First non-empty value among the given environment variables.
fn env_value(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.is_empty())
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| OrcaError::Config(format!("{name} must be a number, got {value:?}")))
}

/// Validate that a URL is well-formed and uses HTTP or HTTPS.
pub fn validate_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            (scheme == "http" || scheme == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn complete_config() -> Config {
        let mut config = Config::default();
        config.smtp.server = "smtp.example.com".to_string();
        config.smtp.username = "relay@example.com".to_string();
        config.smtp.password = "secret".to_string();
        config.smtp.to_address = "owner@example.com".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert!(config.server.cors_origins.is_empty());
        assert_eq!(config.server.contact_rate_limit, 10);
        assert_eq!(config.server.idempotency_window_secs, 86400);
        assert!(!config.server.relay_mint);
        assert!(!config.server.trust_proxy_headers);

        assert_eq!(config.smtp.port, 465);
        assert!(config.smtp.server.is_empty());

        assert_eq!(config.chain.chain_id, 17000);
        assert_eq!(config.chain.chain_name, "Holesky");
        assert_eq!(config.chain.currency_symbol, "ETH");
        assert_eq!(config.chain.decimals, 18);
        assert_eq!(config.chain.explorer_url, "https://holesky.etherscan.io");
        assert_eq!(config.chain.receipt_poll_attempts, 120);
        assert!(!config.chain.is_configured());

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/orcapost.log");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 8080
cors_origins = ["https://example.github.io"]
contact_rate_limit = 3
idempotency_window_secs = 60
relay_mint = true
trust_proxy_headers = true

[smtp]
server = "smtp.example.com"
port = 2465
username = "relay@example.com"
password = "hunter2"
to_address = "owner@example.com"
from_address = "noreply@example.com"

[chain]
contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
chain_id = 31337
chain_name = "Hardhat"
rpc_url = "http://127.0.0.1:8545"
receipt_poll_interval_ms = 50
receipt_poll_attempts = 10

[logging]
level = "debug"
file = "custom/logs/app.log"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.cors_origins, vec!["https://example.github.io"]);
        assert_eq!(config.server.contact_rate_limit, 3);
        assert_eq!(config.server.idempotency_window_secs, 60);
        assert!(config.server.relay_mint);
        assert!(config.server.trust_proxy_headers);

        assert_eq!(config.smtp.port, 2465);
        assert_eq!(config.smtp.sender(), "noreply@example.com");

        assert_eq!(config.chain.chain_id, 31337);
        assert_eq!(config.chain.chain_name, "Hardhat");
        assert_eq!(config.chain.receipt_poll_interval_ms, 50);
        assert_eq!(config.chain.receipt_poll_attempts, 10);
        assert!(config.chain.is_configured());
        // Unspecified chain values keep defaults
        assert_eq!(config.chain.currency_symbol, "ETH");

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, "custom/logs/app.log");
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.smtp.port, 465);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("this is not valid toml [[[");
        match result {
            Err(OrcaError::Config(msg)) => assert!(msg.contains("config parse error")),
            other => panic!("Expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");
        assert!(matches!(result, Err(OrcaError::Io(_))));
    }

    #[test]
    fn test_sender_falls_back_to_username() {
        let config = complete_config();
        assert_eq!(config.smtp.sender(), "relay@example.com");
    }

    #[test]
    fn test_apply_env_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("PORT", "4100");
        std::env::set_var("TO_ADDRESS", "env-owner@example.com");
        std::env::set_var("REACT_APP_CHAIN_ID", "11155111");
        std::env::remove_var("CHAIN_ID");

        let mut config = Config::default();
        config.apply_env_overrides().unwrap();

        assert_eq!(config.server.port, 4100);
        assert_eq!(config.smtp.to_address, "env-owner@example.com");
        assert_eq!(config.chain.chain_id, 11155111);

        std::env::remove_var("PORT");
        std::env::remove_var("TO_ADDRESS");
        std::env::remove_var("REACT_APP_CHAIN_ID");
    }

    #[test]
    fn test_apply_env_overrides_rejects_bad_port() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("SMTP_PORT", "not-a-port");

        let mut config = Config::default();
        let result = config.apply_env_overrides();

        std::env::remove_var("SMTP_PORT");
        assert!(matches!(result, Err(OrcaError::Config(msg)) if msg.contains("SMTP_PORT")));
    }

    #[test]
    fn test_apply_env_overrides_ignores_empty_value() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("SMTP_SERVER", "");

        let mut config = complete_config();
        config.apply_env_overrides().unwrap();

        std::env::remove_var("SMTP_SERVER");
        assert_eq!(config.smtp.server, "smtp.example.com");
    }

    #[test]
    fn test_validate_missing_smtp() {
        let config = Config::default();
        match config.validate() {
            Err(OrcaError::Config(msg)) => {
                assert!(msg.contains("SMTP_SERVER"));
                assert!(msg.contains("TO_ADDRESS"));
            }
            other => panic!("Expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_complete() {
        assert!(complete_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rpc_without_contract() {
        let mut config = complete_config();
        config.chain.rpc_url = "http://127.0.0.1:8545".to_string();
        assert!(config.validate().is_err());

        config.chain.contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_rpc_url() {
        let mut config = complete_config();
        config.chain.rpc_url = "ftp://node.example.com".to_string();
        config.chain.contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://rpc.example.com"));
        assert!(validate_url("http://localhost:8545"));
        assert!(!validate_url(""));
        assert!(!validate_url("not a url"));
        assert!(!validate_url("file:///etc/passwd"));
    }
}
