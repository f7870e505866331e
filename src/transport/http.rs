//! Streamable HTTP transport.
//!
//! Each MCP session gets its own `DbService`; all of them share one facade and
//! one connection catalog.

use crate::catalog::ConnectionCatalog;
use crate::error::{DbError, DbResult};
use crate::facade::DatabaseFacade;
use crate::mcp::DbService;
use crate::transport::{Transport, wait_for_signal};
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// SSE connections can keep the server alive; stop waiting for them after this.
const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpTransport {
    facade: Arc<DatabaseFacade>,
    catalog: Arc<ConnectionCatalog>,
    host: String,
    port: u16,
    /// MCP endpoint path
    endpoint: String,
}

impl HttpTransport {
    pub fn new(
        facade: Arc<DatabaseFacade>,
        catalog: Arc<ConnectionCatalog>,
        host: impl Into<String>,
        port: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            facade,
            catalog,
            host: host.into(),
            port,
            endpoint: endpoint.into(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> DbResult<()> {
        let bind_addr = self.bind_addr();
        info!(addr = %bind_addr, "Starting HTTP transport");

        let facade = self.facade.clone();
        let catalog = self.catalog.clone();
        let service = StreamableHttpService::new(
            move || Ok(DbService::new(facade.clone(), catalog.clone())),
            LocalSessionManager::default().into(),
            Default::default(),
        );

        // nest_service rejects "/", so the root endpoint uses fallback_service
        let app = if self.endpoint == "/" {
            axum::Router::new().fallback_service(service)
        } else {
            axum::Router::new().nest_service(&self.endpoint, service)
        };

        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            DbError::driver(
                format!("Failed to bind to {bind_addr}: {e}"),
                None,
                "Check that the port is available",
            )
        })?;

        info!(endpoint = %self.endpoint, "MCP endpoint ready");

        let shutdown = Arc::new(Notify::new());
        let server = axum::serve(listener, app).with_graceful_shutdown({
            let shutdown = shutdown.clone();
            async move {
                wait_for_signal().await;
                shutdown.notify_one();
            }
        });

        let outcome = tokio::select! {
            result = server => result.map_err(|e| {
                error!(error = %e, "HTTP server error");
                DbError::unexpected(format!("HTTP server error: {e}"))
            }),
            _ = drain_deadline(&shutdown) => Ok(()),
        };

        info!("Closing database connections");
        self.facade.dispose_all().await;
        outcome
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Resolves once shutdown has started and open sessions overstay
/// [`GRACEFUL_TIMEOUT`] or a second signal arrives.
async fn drain_deadline(shutdown: &Notify) {
    shutdown.notified().await;
    info!(
        timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
        "Draining open sessions (signal again to force exit)"
    );
    tokio::select! {
        _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => warn!("Sessions still open after timeout, closing"),
        _ = wait_for_signal() => warn!("Second signal, closing immediately"),
    }
}
