//! Stdio transport for the MCP server.
//!
//! This transport uses standard input/output for communication,
//! which is the standard mode for CLI-based MCP integrations.

use crate::catalog::ConnectionCatalog;
use crate::error::{DbError, DbResult};
use crate::facade::DatabaseFacade;
use crate::mcp::DbService;
use crate::transport::{Transport, force_exit_on_second_signal, wait_for_signal};
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tracing::{info, warn};

/// Stdio transport implementation.
///
/// Reads JSON-RPC messages from stdin and writes responses to stdout.
pub struct StdioTransport {
    facade: Arc<DatabaseFacade>,
    catalog: Arc<ConnectionCatalog>,
}

impl StdioTransport {
    pub fn new(facade: Arc<DatabaseFacade>, catalog: Arc<ConnectionCatalog>) -> Self {
        Self { facade, catalog }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> DbResult<()> {
        info!("Starting MCP server with stdio transport");

        let service = DbService::new(self.facade.clone(), self.catalog.clone());
        let running_service = service
            .serve(stdio())
            .await
            .map_err(|e| DbError::unexpected(format!("Failed to start stdio transport: {e}")))?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                if let Err(e) = result {
                    warn!(error = %e, "Stdio transport error");
                    self.facade.dispose_all().await;
                    return Err(DbError::unexpected(format!("Stdio transport error: {e}")));
                }
                info!("Stdio transport completed normally");
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            force_exit_on_second_signal();
        }

        info!("Closing all database connections");
        self.facade.dispose_all().await;

        if shutdown_requested {
            // stdin reads cannot be interrupted, so leave without waiting for them
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}
