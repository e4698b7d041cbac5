use std::sync::Arc;

use tracing::{error, info};

use orcapost::chain::{provider_from_config, FileMarkerStore};
use orcapost::web::{AppState, WebServer};
use orcapost::{Config, SmtpMailer};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration with environment overrides.");
            let mut config = Config::default();
            if let Err(e) = config.apply_env_overrides() {
                eprintln!("{e}");
                std::process::exit(1);
            }
            config
        }
    };

    // Initialize logging
    if let Err(e) = orcapost::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        orcapost::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(config).await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> orcapost::Result<()> {
    config.validate()?;

    info!("orcapost - contact relay and message registry");
    info!(
        "Server configured on {}:{}",
        config.server.host, config.server.port
    );

    let mailer = Arc::new(SmtpMailer::new(&config.smtp)?);

    let provider = provider_from_config(&config.chain)?;
    if provider.is_some() {
        info!(
            chain_id = config.chain.chain_id,
            contract = %config.chain.contract_address,
            "Message registry enabled"
        );
    } else {
        info!("No RPC endpoint configured, message registry disabled");
    }
    let marker = Arc::new(FileMarkerStore::new(&config.chain.marker_path));

    let state = AppState::from_config(&config, mailer, provider, marker);
    state.restore_session().await;
    WebServer::new(&config.server, state)?.run().await
}
