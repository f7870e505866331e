//! Multi-database MCP Server - Main entry point.
//!
//! This server provides MCP (Model Context Protocol) tools for AI assistants
//! to manage MySQL, Oracle, PostgreSQL, SQLite and SQL Server databases.

use multidb_mcp_server::config::{Config, TransportMode};
use multidb_mcp_server::db::{ConnectionRegistry, QueryExecutor};
use multidb_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use multidb_mcp_server::{ConnectionCatalog, DatabaseFacade};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber. Logs go to stderr; stdout carries MCP.
fn init_tracing(config: &Config) {
    if !config.enable_logs {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse_args();
    init_tracing(&config);

    info!(
        transport = %config.transport,
        config_path = %config.config.display(),
        "Starting Multi-Database MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let registry = ConnectionRegistry::new();
    let executor = QueryExecutor::with_timeout(config.statement_timeout_duration());
    let facade = Arc::new(DatabaseFacade::new(registry.clone(), executor));
    let catalog = Arc::new(ConnectionCatalog::load(&config.config).await?);

    let outcome = registry
        .initialize_from_descriptors(&catalog.enabled().await)
        .await;
    for (name, connected) in &outcome {
        if !connected {
            warn!(connection = %name, "Configured connection failed to connect");
        }
    }

    let result = match config.transport {
        TransportMode::Stdio => {
            let transport = StdioTransport::new(facade, catalog);
            transport.run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            let transport = HttpTransport::new(
                facade,
                catalog,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            );
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
