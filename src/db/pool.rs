//! Connection pool creation.
//!
//! This module opens database-specific pools (MySqlPool, PgPool, SqlitePool,
//! the `bb8` pool of `tiberius` clients for SQL Server, and the Oracle
//! session pool when built with the `oracle` feature) from a connection
//! string and the descriptor's pool options.

use crate::config::PoolOptions;
use crate::db::mssql::MssqlPool;
#[cfg(feature = "oracle")]
use crate::db::oracle::OraclePool;
use crate::error::{DbError, DbResult};
use crate::models::DatabaseType;
use sqlx::{
    MySqlPool, PgPool, SqlitePool, mysql::MySqlConnectOptions, mysql::MySqlPoolOptions,
    postgres::PgConnectOptions, postgres::PgPoolOptions, sqlite::SqliteConnectOptions,
    sqlite::SqlitePoolOptions,
};
use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use std::str::FromStr;
use tracing::info;
use url::Url;

/// Database-specific connection pool (avoids AnyPool limitations).
#[derive(Debug, Clone)]
pub enum DbPool {
    MySql(MySqlPool),
    Postgres(PgPool),
    SQLite(SqlitePool),
    SqlServer(MssqlPool),
    #[cfg(feature = "oracle")]
    Oracle(OraclePool),
}

impl DbPool {
    /// Open a pool for `db_type` and verify that a connection can be made.
    pub async fn connect(
        db_type: DatabaseType,
        connection_string: &str,
        options: &PoolOptions,
    ) -> DbResult<Self> {
        let is_sqlite = db_type.is_file_based();
        let max_connections = options.max_connections(is_sqlite);
        let acquire_timeout = options.acquire_timeout();
        let max_lifetime = Some(options.max_lifetime());

        info!(
            db_type = %db_type,
            connection = %mask_connection_string(connection_string),
            max_connections = max_connections,
            "Opening connection pool"
        );

        match db_type {
            DatabaseType::MySQL => {
                let connect_options = MySqlConnectOptions::from_str(connection_string)
                    .map_err(|e| {
                        DbError::validation(format!("Invalid MySQL connection string: {e}"))
                    })?
                    .charset("utf8mb4");

                let pool = MySqlPoolOptions::new()
                    .max_connections(max_connections)
                    .acquire_timeout(acquire_timeout)
                    .max_lifetime(max_lifetime)
                    .connect_with(connect_options)
                    .await
                    .map_err(|e| connect_error(db_type, e))?;
                Ok(DbPool::MySql(pool))
            }
            DatabaseType::PostgreSQL => {
                let connect_options = PgConnectOptions::from_str(connection_string).map_err(|e| {
                    DbError::validation(format!("Invalid PostgreSQL connection string: {e}"))
                })?;

                let pool = PgPoolOptions::new()
                    .max_connections(max_connections)
                    .acquire_timeout(acquire_timeout)
                    .max_lifetime(max_lifetime)
                    .connect_with(connect_options)
                    .await
                    .map_err(|e| connect_error(db_type, e))?;
                Ok(DbPool::Postgres(pool))
            }
            DatabaseType::SQLite => {
                let connect_options = SqliteConnectOptions::from_str(connection_string)
                    .map_err(|e| {
                        DbError::validation(format!("Invalid SQLite connection string: {e}"))
                    })?
                    .create_if_missing(true);

                let pool = SqlitePoolOptions::new()
                    .max_connections(max_connections)
                    .acquire_timeout(acquire_timeout)
                    .max_lifetime(max_lifetime)
                    .connect_with(connect_options)
                    .await
                    .map_err(|e| connect_error(db_type, e))?;
                Ok(DbPool::SQLite(pool))
            }
            DatabaseType::SqlServer => {
                let pool = MssqlPool::connect(connection_string, options)
                    .await
                    .map_err(|e| driver_connect_error(db_type, e))?;
                Ok(DbPool::SqlServer(pool))
            }
            #[cfg(feature = "oracle")]
            DatabaseType::Oracle => {
                let pool = OraclePool::connect(connection_string, options)
                    .await
                    .map_err(|e| driver_connect_error(db_type, e))?;
                Ok(DbPool::Oracle(pool))
            }
            #[cfg(not(feature = "oracle"))]
            DatabaseType::Oracle => Err(DbError::driver(
                "no Oracle driver available",
                None,
                "Rebuild with the `oracle` feature to connect to Oracle; SQL generation is still available",
            )),
        }
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        match self {
            DbPool::MySql(pool) => pool.close().await,
            DbPool::Postgres(pool) => pool.close().await,
            DbPool::SQLite(pool) => pool.close().await,
            DbPool::SqlServer(pool) => pool.close().await,
            #[cfg(feature = "oracle")]
            DbPool::Oracle(pool) => pool.close().await,
        }
    }

    /// Get the database type for this pool.
    pub fn db_type(&self) -> DatabaseType {
        match self {
            DbPool::MySql(_) => DatabaseType::MySQL,
            DbPool::Postgres(_) => DatabaseType::PostgreSQL,
            DbPool::SQLite(_) => DatabaseType::SQLite,
            DbPool::SqlServer(_) => DatabaseType::SqlServer,
            #[cfg(feature = "oracle")]
            DbPool::Oracle(_) => DatabaseType::Oracle,
        }
    }
}

/// Prefix a driver error raised while connecting and attach a connection hint.
fn driver_connect_error(db_type: DatabaseType, error: DbError) -> DbError {
    match error {
        DbError::Driver {
            message, sql_state, ..
        } => DbError::driver(
            format!("Failed to connect: {message}"),
            sql_state,
            connection_suggestion(db_type, &message),
        ),
        other => other,
    }
}

fn connect_error(db_type: DatabaseType, error: sqlx::Error) -> DbError {
    let suggestion = connection_suggestion(db_type, &error.to_string());
    DbError::driver(format!("Failed to connect: {error}"), None, suggestion)
}

/// Generate a helpful suggestion for connection errors.
pub fn connection_suggestion(db_type: DatabaseType, error: &str) -> String {
    let error_str = error.to_lowercase();

    if error_str.contains("connection refused") {
        return format!("Check that the {db_type} server is running and accessible");
    }

    if error_str.contains("authentication")
        || error_str.contains("password")
        || error_str.contains("login failed")
    {
        return "Verify the username and password of the connection".to_string();
    }

    if error_str.contains("does not exist")
        || error_str.contains("unknown database")
        || error_str.contains("cannot open database")
    {
        return "Check that the database name exists".to_string();
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check TLS/SSL configuration or try disabling it".to_string();
    }

    match db_type {
        DatabaseType::SQLite => {
            "Verify the database file path exists and its directory is writable".to_string()
        }
        _ => format!(
            "Verify host, port and database of the {db_type} connection (default port {})",
            db_type.default_port().unwrap_or_default()
        ),
    }
}

/// Percent-decode one component of a connection URL.
pub(crate) fn url_part(part: &str) -> DbResult<String> {
    percent_decode_str(part)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|e| DbError::validation(format!("connection string is not valid UTF-8: {e}")))
}

/// Replace the password of a connection URL with `****` for logging.
pub fn mask_connection_string(connection_string: &str) -> String {
    match Url::parse(connection_string) {
        Ok(mut url) if url.password().is_some() => {
            if url.set_password(Some("****")).is_err() {
                return "<redacted>".to_string();
            }
            url.to_string()
        }
        Ok(url) => url.to_string(),
        Err(_) => "<redacted>".to_string(),
    }
}
