//! Configuration handling for the multi-database MCP server.
//!
//! This module provides configuration management via CLI arguments and
//! environment variables, plus the per-connection pool options that the
//! connections file carries alongside each descriptor.

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/database_config.json";
pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";

// Pool configuration defaults
pub const DEFAULT_POOL_SIZE: u32 = 10;
pub const DEFAULT_MAX_OVERFLOW: u32 = 20;
pub const DEFAULT_POOL_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_POOL_RECYCLE_SECS: u64 = 3600;
pub const MAX_CONNECTIONS_SQLITE: u32 = 1;

/// Connection pool options carried by a connection descriptor.
///
/// Field names follow the connections file (`pool_size`, `max_overflow`,
/// `pool_timeout`, `pool_recycle`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolOptions {
    /// Steady-state pool size (default: 10)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_size: Option<u32>,
    /// Extra connections allowed above `pool_size` (default: 20)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_overflow: Option<u32>,
    /// Seconds to wait for a free connection (default: 30)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_timeout: Option<u64>,
    /// Maximum connection age in seconds (default: 3600)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_recycle: Option<u64>,
}

impl PoolOptions {
    /// Total connections the driver pool may open.
    pub fn max_connections(&self, is_sqlite: bool) -> u32 {
        if is_sqlite {
            return MAX_CONNECTIONS_SQLITE;
        }
        self.pool_size.unwrap_or(DEFAULT_POOL_SIZE)
            + self.max_overflow.unwrap_or(DEFAULT_MAX_OVERFLOW)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_timeout.unwrap_or(DEFAULT_POOL_TIMEOUT_SECS))
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.pool_recycle.unwrap_or(DEFAULT_POOL_RECYCLE_SECS))
    }

    /// Validate pool options and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.pool_size == Some(0) {
            return Err("pool_size must be greater than 0".to_string());
        }
        if self.pool_timeout == Some(0) {
            return Err("pool_timeout must be greater than 0".to_string());
        }
        if self.pool_recycle == Some(0) {
            return Err("pool_recycle must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP (for web clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Configuration for the multi-database MCP server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "multidb-mcp-server",
    about = "MCP server for MySQL, Oracle, PostgreSQL, SQLite and SQL Server - connections, schemas and CRUD",
    version,
    author
)]
pub struct Config {
    /// Path of the JSON connections file ({"connections": [...]})
    #[arg(
        short,
        long,
        value_name = "PATH",
        default_value = DEFAULT_CONFIG_PATH,
        env = "DATABASE_CONFIG_PATH"
    )]
    pub config: PathBuf,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_HTTP_HOST,
        env = "MCP_HTTP_HOST"
    )]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(
        long,
        default_value_t = DEFAULT_HTTP_PORT,
        env = "MCP_HTTP_PORT"
    )]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_MCP_ENDPOINT,
        env = "MCP_ENDPOINT"
    )]
    pub mcp_endpoint: String,

    /// Per-statement timeout in seconds. Unset means statements may run indefinitely.
    #[arg(long, value_name = "SECS", env = "MCP_STATEMENT_TIMEOUT")]
    pub statement_timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,

    /// Enable logging output (disabled by default to avoid interfering with stdio transport)
    #[arg(long, env = "MCP_ENABLE_LOGS")]
    pub enable_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            config: PathBuf::from(DEFAULT_CONFIG_PATH),
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            statement_timeout: None,
            log_level: "info".to_string(),
            json_logs: false,
            enable_logs: false,
        }
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Statement timeout, if one was configured.
    pub fn statement_timeout_duration(&self) -> Option<Duration> {
        self.statement_timeout
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.transport, TransportMode::Stdio);
        assert_eq!(config.http_host, DEFAULT_HTTP_HOST);
        assert_eq!(config.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(config.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(config.statement_timeout_duration().is_none());
    }

    #[test]
    fn test_http_bind_addr() {
        let config = Config {
            http_host: "0.0.0.0".to_string(),
            http_port: 3000,
            ..Config::default()
        };
        assert_eq!(config.http_bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_statement_timeout() {
        let config = Config {
            statement_timeout: Some(15),
            ..Config::default()
        };
        assert_eq!(
            config.statement_timeout_duration(),
            Some(Duration::from_secs(15))
        );

        let zero = Config {
            statement_timeout: Some(0),
            ..Config::default()
        };
        assert!(zero.statement_timeout_duration().is_none());
    }

    #[test]
    fn test_cli_parsing() {
        let config = Config::parse_from([
            "multidb-mcp-server",
            "--config",
            "/etc/dbs.json",
            "--transport",
            "http",
            "--statement-timeout",
            "5",
        ]);
        assert_eq!(config.config, PathBuf::from("/etc/dbs.json"));
        assert_eq!(config.transport, TransportMode::Http);
        assert_eq!(config.statement_timeout, Some(5));
    }

    #[test]
    fn test_pool_defaults() {
        let opts = PoolOptions::default();
        assert_eq!(opts.max_connections(false), 30);
        assert_eq!(opts.max_connections(true), 1);
        assert_eq!(opts.acquire_timeout(), Duration::from_secs(30));
        assert_eq!(opts.max_lifetime(), Duration::from_secs(3600));
    }

    #[test]
    fn test_pool_size_plus_overflow() {
        let opts = PoolOptions {
            pool_size: Some(4),
            max_overflow: Some(0),
            ..Default::default()
        };
        assert_eq!(opts.max_connections(false), 4);
    }

    #[test]
    fn test_pool_validation() {
        assert!(PoolOptions::default().validate().is_ok());

        let bad = PoolOptions {
            pool_size: Some(0),
            ..Default::default()
        };
        assert!(bad.validate().unwrap_err().contains("pool_size"));

        let bad = PoolOptions {
            pool_timeout: Some(0),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
