//! Schema and data operations.
//!
//! Operations resolve a connection name through the [`ConnectionRegistry`],
//! ask the connection's dialect adapter for SQL and run it. Every mutating
//! operation runs inside its own transaction and either commits as a whole
//! or leaves no effect behind.

pub mod data;
pub mod schema;

pub use data::DataOperations;
pub use schema::SchemaOperations;

use crate::db::{DbPool, DbTransaction};
use crate::error::{DbError, DbResult};
use crate::models::{BoundQuery, QueryParam};
use std::time::Duration;
use tracing::{error, warn};

/// Parameter values of a generated statement, in placeholder order.
pub(crate) fn param_values(query: &BoundQuery) -> Vec<QueryParam> {
    query.values().cloned().collect()
}

pub(crate) fn require_table(table: &str) -> DbResult<()> {
    if table.trim().is_empty() {
        return Err(DbError::validation("table name must not be empty"));
    }
    Ok(())
}

/// Run `statements` in order inside one transaction.
///
/// Returns the summed affected-row count. On the first failure the
/// transaction is rolled back and that failure is returned.
pub(crate) async fn execute_atomically(
    pool: &DbPool,
    statement_timeout: Option<Duration>,
    connection: &str,
    statements: &[BoundQuery],
) -> DbResult<u64> {
    let mut tx = DbTransaction::begin(pool, statement_timeout).await?;
    let mut rows_affected = 0;

    for statement in statements {
        match tx.execute(&statement.sql, &param_values(statement)).await {
            Ok(rows) => rows_affected += rows,
            Err(e) => {
                error!(
                    connection = %connection,
                    sql = %statement.sql,
                    params = ?statement.param_names(),
                    error = %e,
                    "Statement failed, rolling back"
                );
                if let Err(rollback_error) = tx.rollback().await {
                    warn!(
                        connection = %connection,
                        error = %rollback_error,
                        "Rollback failed"
                    );
                }
                return Err(e);
            }
        }
    }

    tx.commit().await?;
    Ok(rows_affected)
}
