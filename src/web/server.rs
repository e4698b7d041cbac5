//! Web server for the orcapost relay.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::config::ServerConfig;
use crate::error::{OrcaError, Result};

use super::handlers::AppState;
use super::middleware::RateLimitState;
use super::router::{create_router, create_swagger_router};

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Server configuration.
    config: ServerConfig,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &ServerConfig, app_state: AppState) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port)
            .parse::<SocketAddr>()
            .map_err(|e| {
                OrcaError::Config(format!(
                    "invalid listen address {}:{}: {e}",
                    config.host, config.port
                ))
            })?;

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
            config: config.clone(),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Periodically drop idempotency keys older than the window.
    fn start_idempotency_cleanup_task(app_state: Arc<AppState>) {
        tokio::spawn(async move {
            const CLEANUP_INTERVAL_SECS: u64 = 300;

            let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));

            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;
                let purged = app_state.contact.ledger().purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, "Purged expired idempotency keys");
                }
            }
        });
    }

    fn build_router(self) -> Router {
        let rate_limit = Arc::new(
            RateLimitState::new(self.config.contact_rate_limit)
                .trust_proxy_headers(self.config.trust_proxy_headers),
        );
        rate_limit.clone().start_cleanup_task();
        Self::start_idempotency_cleanup_task(self.app_state.clone());

        create_router(self.app_state, rate_limit, &self.config.cors_origins)
            .merge(create_swagger_router())
            .layer(CompressionLayer::new())
    }

    async fn bind(&self) -> Result<(TcpListener, SocketAddr)> {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Web server listening on http://{}", local_addr);
        Ok((listener, local_addr))
    }

    /// Run the web server.
    pub async fn run(self) -> Result<()> {
        let (listener, _) = self.bind().await?;
        let router = self.build_router();

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr> {
        let (listener, local_addr) = self.bind().await?;
        let router = self.build_router();

        tokio::spawn(async move {
            if let Err(e) = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::{ContactService, MailError, MailTransport, OutgoingMail};
    use async_trait::async_trait;

    struct NullTransport;

    #[async_trait]
    impl MailTransport for NullTransport {
        async fn send(&self, _mail: &OutgoingMail) -> std::result::Result<(), MailError> {
            Ok(())
        }
    }

    fn create_test_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..ServerConfig::default()
        }
    }

    fn app_state() -> AppState {
        AppState::new(ContactService::new(
            Arc::new(NullTransport),
            "owner@example.com",
            Duration::from_secs(60),
        ))
    }

    #[test]
    fn test_web_server_new() {
        let server = WebServer::new(&create_test_config(), app_state()).unwrap();
        assert_eq!(server.addr().ip().to_string(), "127.0.0.1");
    }

    #[test]
    fn test_web_server_rejects_bad_host() {
        let config = ServerConfig {
            host: "not a host".to_string(),
            ..create_test_config()
        };
        assert!(WebServer::new(&config, app_state()).is_err());
    }

    #[tokio::test]
    async fn test_web_server_run() {
        let server = WebServer::new(&create_test_config(), app_state()).unwrap();
        let addr = server.run_with_addr().await.unwrap();

        let client = reqwest::Client::new();
        let resp = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap();

        assert!(resp.status().is_success());
        assert_eq!(resp.text().await.unwrap(), "OK");
    }
}
