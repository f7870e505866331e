//! Single-call transactions.
//!
//! Every mutating operation runs in its own transaction: begin, run the
//! statements in order, then commit, or roll back on the first error. A
//! transaction dropped without commit is rolled back by the driver.

use crate::db::executor::{self, with_timeout};
use crate::db::mssql::MssqlConnection;
#[cfg(feature = "oracle")]
use crate::db::oracle::OracleConnection;
use crate::db::pool::DbPool;
use crate::error::{DbError, DbResult};
use crate::models::{DatabaseType, QueryParam, Row};
use sqlx::{MySql, Postgres, Sqlite, Transaction};
use std::time::Duration;
use tracing::debug;

/// Engine-specific transaction handle.
enum TxConnection {
    MySql(Transaction<'static, MySql>),
    Postgres(Transaction<'static, Postgres>),
    SQLite(Transaction<'static, Sqlite>),
    SqlServer(MssqlConnection),
    #[cfg(feature = "oracle")]
    Oracle(OracleConnection),
}

/// An open transaction on one pooled connection.
pub struct DbTransaction {
    connection: TxConnection,
    statement_timeout: Option<Duration>,
}

impl DbTransaction {
    /// Check out a connection and begin a transaction on it.
    pub async fn begin(pool: &DbPool, statement_timeout: Option<Duration>) -> DbResult<Self> {
        let connection = match pool {
            DbPool::MySql(p) => TxConnection::MySql(p.begin().await?),
            DbPool::Postgres(p) => TxConnection::Postgres(p.begin().await?),
            DbPool::SQLite(p) => TxConnection::SQLite(p.begin().await?),
            DbPool::SqlServer(p) => {
                let mut client = p.acquire().await?;
                client.begin().await?;
                TxConnection::SqlServer(client)
            }
            #[cfg(feature = "oracle")]
            DbPool::Oracle(p) => {
                let mut conn = p.acquire().await?;
                conn.begin().await?;
                TxConnection::Oracle(conn)
            }
        };
        Ok(Self {
            connection,
            statement_timeout,
        })
    }

    pub fn db_type(&self) -> DatabaseType {
        match &self.connection {
            TxConnection::MySql(_) => DatabaseType::MySQL,
            TxConnection::Postgres(_) => DatabaseType::PostgreSQL,
            TxConnection::SQLite(_) => DatabaseType::SQLite,
            TxConnection::SqlServer(_) => DatabaseType::SqlServer,
            #[cfg(feature = "oracle")]
            TxConnection::Oracle(_) => DatabaseType::Oracle,
        }
    }

    /// Execute a statement within the transaction.
    pub async fn execute(&mut self, sql: &str, params: &[QueryParam]) -> DbResult<u64> {
        let connection = &mut self.connection;
        let rows_affected = with_timeout(self.statement_timeout, "statement execution", async move {
            match connection {
                TxConnection::MySql(tx) => executor::mysql::execute(&mut **tx, sql, params).await,
                TxConnection::Postgres(tx) => {
                    executor::postgres::execute(&mut **tx, sql, params).await
                }
                TxConnection::SQLite(tx) => executor::sqlite::execute(&mut **tx, sql, params).await,
                TxConnection::SqlServer(client) => client.execute(sql, params).await,
                #[cfg(feature = "oracle")]
                TxConnection::Oracle(conn) => conn.execute(sql, params).await,
            }
        })
        .await?;

        debug!(sql = %sql, rows_affected = rows_affected, "Executed in transaction");
        Ok(rows_affected)
    }

    /// Run a query within the transaction.
    pub async fn fetch(&mut self, sql: &str, params: &[QueryParam]) -> DbResult<Vec<Row>> {
        let connection = &mut self.connection;
        let rows = with_timeout(self.statement_timeout, "query execution", async move {
            match connection {
                TxConnection::MySql(tx) => executor::mysql::fetch(&mut **tx, sql, params).await,
                TxConnection::Postgres(tx) => {
                    executor::postgres::fetch(&mut **tx, sql, params).await
                }
                TxConnection::SQLite(tx) => executor::sqlite::fetch(&mut **tx, sql, params).await,
                TxConnection::SqlServer(client) => client.fetch(sql, params).await,
                #[cfg(feature = "oracle")]
                TxConnection::Oracle(conn) => conn.fetch(sql, params).await,
            }
        })
        .await?;

        debug!(sql = %sql, row_count = rows.len(), "Queried in transaction");
        Ok(rows)
    }

    /// Commit the transaction.
    pub async fn commit(self) -> DbResult<()> {
        match self.connection {
            TxConnection::MySql(tx) => tx.commit().await.map_err(DbError::from),
            TxConnection::Postgres(tx) => tx.commit().await.map_err(DbError::from),
            TxConnection::SQLite(tx) => tx.commit().await.map_err(DbError::from),
            TxConnection::SqlServer(mut client) => client.commit().await,
            #[cfg(feature = "oracle")]
            TxConnection::Oracle(mut conn) => conn.commit().await,
        }
    }

    /// Rollback the transaction.
    pub async fn rollback(self) -> DbResult<()> {
        match self.connection {
            TxConnection::MySql(tx) => tx.rollback().await.map_err(DbError::from),
            TxConnection::Postgres(tx) => tx.rollback().await.map_err(DbError::from),
            TxConnection::SQLite(tx) => tx.rollback().await.map_err(DbError::from),
            TxConnection::SqlServer(mut client) => client.rollback().await,
            #[cfg(feature = "oracle")]
            TxConnection::Oracle(mut conn) => conn.rollback().await,
        }
    }
}
