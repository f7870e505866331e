//! Error types for the multi-database MCP server.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Each error variant provides actionable messages to help AI assistants understand
//! and recover from error conditions.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection not found: {name}")]
    ConnectionNotFound { name: String },

    /// A live handle exists without a bound dialect. Should never happen.
    #[error("No dialect adapter bound to connection: {name}")]
    AdapterNotFound { name: String },

    #[error("Unsupported database type: {engine}")]
    UnsupportedEngineType { engine: String },

    #[error("{engine} does not support {operation}")]
    UnsupportedOperation { engine: String, operation: String },

    #[error("Invalid input: {message}")]
    Validation { message: String },

    #[error(
        "Batch update requires one condition set per data record (got {data_len} records and {conditions_len} condition sets)"
    )]
    ArityMismatch {
        data_len: usize,
        conditions_len: usize,
    },

    #[error("Database error: {message}")]
    Driver {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Internal error: {message}")]
    Unexpected { message: String },
}

impl DbError {
    /// Create a connection not found error.
    pub fn connection_not_found(name: impl Into<String>) -> Self {
        Self::ConnectionNotFound { name: name.into() }
    }

    pub fn adapter_not_found(name: impl Into<String>) -> Self {
        Self::AdapterNotFound { name: name.into() }
    }

    /// Create an unsupported engine type error.
    pub fn unsupported_engine_type(engine: impl Into<String>) -> Self {
        Self::UnsupportedEngineType {
            engine: engine.into(),
        }
    }

    /// Create an unsupported operation error.
    pub fn unsupported_operation(engine: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            engine: engine.into(),
            operation: operation.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn arity_mismatch(data_len: usize, conditions_len: usize) -> Self {
        Self::ArityMismatch {
            data_len,
            conditions_len,
        }
    }

    /// Create a driver error with optional SQL state.
    pub fn driver(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Driver {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create a catch-all error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Driver { suggestion, .. } => Some(suggestion),
            Self::ConnectionNotFound { .. } => {
                Some("Call listConnections to see the available connection names")
            }
            Self::UnsupportedEngineType { .. } => {
                Some("Use one of: mysql, oracle, postgresql, sqlite, sqlserver")
            }
            Self::ArityMismatch { .. } => {
                Some("Pass exactly one conditions object for each data record")
            }
            Self::Timeout { .. } => {
                Some("Consider increasing the timeout or optimizing the operation")
            }
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::driver(
                msg.to_string(),
                None,
                "Check the connection parameters and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::driver(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => DbError::driver(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => {
                DbError::timeout("connection pool acquire", crate::config::DEFAULT_POOL_TIMEOUT_SECS)
            }
            sqlx::Error::PoolClosed => DbError::driver(
                "Connection pool is closed",
                None,
                "Add the connection again",
            ),
            sqlx::Error::Io(io_err) => DbError::driver(
                format!("I/O error: {io_err}"),
                None,
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::driver(
                format!("TLS error: {tls_err}"),
                None,
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::driver(
                format!("Protocol error: {msg}"),
                None,
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => DbError::driver(
                format!("Column not found: {col}"),
                None,
                "Call describeTable to list the table's columns",
            ),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::unexpected(format!("Failed to decode column {index}: {source}"))
            }
            sqlx::Error::Decode(source) => DbError::unexpected(format!("Decode error: {source}")),
            sqlx::Error::WorkerCrashed => DbError::unexpected("Database worker crashed"),
            other => DbError::unexpected(format!("Unknown database error: {other}")),
        }
    }
}

/// Convert SQL Server (TDS) errors to DbError.
impl From<tiberius::error::Error> for DbError {
    fn from(err: tiberius::error::Error) -> Self {
        match err {
            tiberius::error::Error::Server(token) => DbError::driver(
                token.message().to_string(),
                Some(token.code().to_string()),
                "Check the SQL syntax and referenced objects",
            ),
            tiberius::error::Error::Io { message, .. } => DbError::driver(
                format!("I/O error: {message}"),
                None,
                "Check network connectivity and database server status",
            ),
            tiberius::error::Error::Tls(message) => DbError::driver(
                format!("TLS error: {message}"),
                None,
                "Verify TLS configuration and certificates",
            ),
            other => DbError::driver(
                other.to_string(),
                None,
                "Check SQL Server compatibility and the statement",
            ),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert DbError to MCP ErrorData for semantic error categorization.
/// Includes the suggestion field in the `data` object when available.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        let data = suggestion_data(err.suggestion());
        match &err {
            DbError::Validation { .. }
            | DbError::ArityMismatch { .. }
            | DbError::UnsupportedOperation { .. }
            | DbError::UnsupportedEngineType { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), data)
            }

            DbError::ConnectionNotFound { .. } => {
                rmcp::ErrorData::resource_not_found(err.to_string(), data)
            }

            DbError::Driver {
                message, sql_state, ..
            } => {
                let msg = match sql_state {
                    Some(code) => format!("{message} (SQLSTATE: {code})"),
                    None => message.clone(),
                };
                rmcp::ErrorData::internal_error(msg, data)
            }

            DbError::Timeout { .. } | DbError::AdapterNotFound { .. } | DbError::Unexpected { .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), data)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::unsupported_operation("SQLite", "drop_column");
        assert_eq!(err.to_string(), "SQLite does not support drop_column");

        let err = DbError::arity_mismatch(1, 2);
        assert!(err.to_string().contains("1 records and 2 condition sets"));
    }

    #[test]
    fn test_error_suggestion() {
        let err = DbError::driver("Syntax error", Some("42601".to_string()), "Check SQL syntax");
        assert_eq!(err.suggestion(), Some("Check SQL syntax"));
        assert!(DbError::validation("bad").suggestion().is_none());
    }

    #[test]
    fn test_error_retryable() {
        assert!(DbError::timeout("query", 30).is_retryable());
        assert!(!DbError::validation("bad").is_retryable());
    }

    #[test]
    fn test_validation_maps_to_invalid_params() {
        let mcp_err: rmcp::ErrorData = DbError::validation("bad input").into();
        // invalid_params uses -32602
        assert_eq!(mcp_err.code.0, -32602);
    }

    #[test]
    fn test_arity_and_unsupported_map_to_invalid_params() {
        let mcp_err: rmcp::ErrorData = DbError::arity_mismatch(1, 2).into();
        assert_eq!(mcp_err.code.0, -32602);

        let mcp_err: rmcp::ErrorData =
            DbError::unsupported_operation("SQLite", "rename_column").into();
        assert_eq!(mcp_err.code.0, -32602);

        let mcp_err: rmcp::ErrorData = DbError::unsupported_engine_type("db2").into();
        assert_eq!(mcp_err.code.0, -32602);
    }

    #[test]
    fn test_connection_not_found_maps_to_resource_not_found() {
        let mcp_err: rmcp::ErrorData = DbError::connection_not_found("conn1").into();
        // resource_not_found uses -32002 in rmcp
        assert_eq!(mcp_err.code.0, -32002);
        assert!(mcp_err.data.is_some());
    }

    #[test]
    fn test_driver_maps_to_internal_error_with_sql_state() {
        let err = DbError::driver("syntax error", Some("42601".to_string()), "check syntax");
        let mcp_err: rmcp::ErrorData = err.into();
        // internal_error uses -32603
        assert_eq!(mcp_err.code.0, -32603);
        assert!(mcp_err.message.contains("42601"));
        let data = mcp_err.data.unwrap();
        assert_eq!(data["suggestion"], "check syntax");
    }

    #[test]
    fn test_timeout_and_unexpected_map_to_internal_error() {
        let mcp_err: rmcp::ErrorData = DbError::timeout("query", 30).into();
        assert_eq!(mcp_err.code.0, -32603);

        let mcp_err: rmcp::ErrorData = DbError::unexpected("boom").into();
        assert_eq!(mcp_err.code.0, -32603);

        let mcp_err: rmcp::ErrorData = DbError::adapter_not_found("x").into();
        assert_eq!(mcp_err.code.0, -32603);
    }

    #[test]
    fn test_sqlx_pool_timeout_becomes_timeout() {
        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, DbError::Timeout { .. }));
    }
}
