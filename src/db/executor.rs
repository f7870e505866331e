//! Statement execution.
//!
//! This module runs generated or caller-supplied SQL against a [`DbPool`] or
//! an open [`DbTransaction`](crate::db::DbTransaction) and returns rows as
//! column-ordered JSON maps.
//!
//! # Architecture
//!
//! The sqlx engines share one shape, implemented once per engine in the
//! submodules below so each can bind parameters with its own argument type:
//! - `mysql`: MySQL statements
//! - `postgres`: PostgreSQL statements
//! - `sqlite`: SQLite statements
//!
//! SQL Server goes through the `bb8` pool of `tiberius` clients in
//! [`crate::db::mssql`]; Oracle, when enabled, through `crate::db::oracle`.
//!
//! Statements without parameters run unprepared, so DDL that cannot be
//! prepared (e.g. MySQL `CREATE PROCEDURE`) still works.

use crate::db::pool::DbPool;
use crate::error::{DbError, DbResult};
use crate::models::{QueryParam, Row};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

/// Runs statements with an optional per-statement timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryExecutor {
    statement_timeout: Option<Duration>,
}

impl QueryExecutor {
    /// Executor without a statement timeout.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(statement_timeout: Option<Duration>) -> Self {
        Self { statement_timeout }
    }

    pub fn statement_timeout(&self) -> Option<Duration> {
        self.statement_timeout
    }

    /// Run a statement and return its rows (empty for statements without a result set).
    pub async fn fetch(&self, pool: &DbPool, sql: &str, params: &[QueryParam]) -> DbResult<Vec<Row>> {
        let start = Instant::now();
        debug!(sql = %sql, params = params.len(), "Executing query");

        let rows = with_timeout(self.statement_timeout, "query execution", async {
            match pool {
                DbPool::MySql(p) => mysql::fetch(p, sql, params).await,
                DbPool::Postgres(p) => postgres::fetch(p, sql, params).await,
                DbPool::SQLite(p) => sqlite::fetch(p, sql, params).await,
                DbPool::SqlServer(p) => p.acquire().await?.fetch(sql, params).await,
                #[cfg(feature = "oracle")]
                DbPool::Oracle(p) => p.acquire().await?.fetch(sql, params).await,
            }
        })
        .await?;

        debug!(
            row_count = rows.len(),
            execution_time_ms = start.elapsed().as_millis() as u64,
            "Query completed"
        );
        Ok(rows)
    }

    /// Run a statement and return the number of affected rows.
    pub async fn execute(&self, pool: &DbPool, sql: &str, params: &[QueryParam]) -> DbResult<u64> {
        debug!(sql = %sql, params = params.len(), "Executing statement");

        with_timeout(self.statement_timeout, "statement execution", async {
            match pool {
                DbPool::MySql(p) => mysql::execute(p, sql, params).await,
                DbPool::Postgres(p) => postgres::execute(p, sql, params).await,
                DbPool::SQLite(p) => sqlite::execute(p, sql, params).await,
                DbPool::SqlServer(p) => p.acquire().await?.execute(sql, params).await,
                #[cfg(feature = "oracle")]
                DbPool::Oracle(p) => p.acquire().await?.execute(sql, params).await,
            }
        })
        .await
    }
}

/// Bound a driver call by the statement timeout, when one is set.
pub(crate) async fn with_timeout<T>(
    limit: Option<Duration>,
    operation: &str,
    future: impl Future<Output = DbResult<T>>,
) -> DbResult<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| DbError::timeout(operation, limit.as_secs()))?,
        None => future.await,
    }
}

// =============================================================================
// Engine-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its database type.
// The functions accept any sqlx executor: a pool or a transaction connection.

pub(crate) mod mysql {
    use super::*;
    use crate::db::params::BindParams;
    use crate::db::types::RowToJson;
    use sqlx::{Executor, MySql};

    pub async fn fetch<'c, E>(executor: E, sql: &str, params: &[QueryParam]) -> DbResult<Vec<Row>>
    where
        E: Executor<'c, Database = MySql>,
    {
        let rows = if params.is_empty() {
            executor.fetch_all(sql).await?
        } else {
            sqlx::query(sql).bind_params(params).fetch_all(executor).await?
        };
        Ok(rows.iter().map(RowToJson::to_json_row).collect())
    }

    pub async fn execute<'c, E>(executor: E, sql: &str, params: &[QueryParam]) -> DbResult<u64>
    where
        E: Executor<'c, Database = MySql>,
    {
        let result = if params.is_empty() {
            executor.execute(sql).await?
        } else {
            sqlx::query(sql).bind_params(params).execute(executor).await?
        };
        Ok(result.rows_affected())
    }
}

pub(crate) mod postgres {
    use super::*;
    use crate::db::params::BindParams;
    use crate::db::types::RowToJson;
    use sqlx::{Executor, Postgres};

    pub async fn fetch<'c, E>(executor: E, sql: &str, params: &[QueryParam]) -> DbResult<Vec<Row>>
    where
        E: Executor<'c, Database = Postgres>,
    {
        let rows = if params.is_empty() {
            executor.fetch_all(sql).await?
        } else {
            sqlx::query(sql).bind_params(params).fetch_all(executor).await?
        };
        Ok(rows.iter().map(RowToJson::to_json_row).collect())
    }

    pub async fn execute<'c, E>(executor: E, sql: &str, params: &[QueryParam]) -> DbResult<u64>
    where
        E: Executor<'c, Database = Postgres>,
    {
        let result = if params.is_empty() {
            executor.execute(sql).await?
        } else {
            sqlx::query(sql).bind_params(params).execute(executor).await?
        };
        Ok(result.rows_affected())
    }
}

pub(crate) mod sqlite {
    use super::*;
    use crate::db::params::BindParams;
    use crate::db::types::RowToJson;
    use sqlx::{Executor, Sqlite};

    pub async fn fetch<'c, E>(executor: E, sql: &str, params: &[QueryParam]) -> DbResult<Vec<Row>>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        let rows = if params.is_empty() {
            executor.fetch_all(sql).await?
        } else {
            sqlx::query(sql).bind_params(params).fetch_all(executor).await?
        };
        Ok(rows.iter().map(RowToJson::to_json_row).collect())
    }

    pub async fn execute<'c, E>(executor: E, sql: &str, params: &[QueryParam]) -> DbResult<u64>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        let result = if params.is_empty() {
            executor.execute(sql).await?
        } else {
            sqlx::query(sql).bind_params(params).execute(executor).await?
        };
        Ok(result.rows_affected())
    }
}
