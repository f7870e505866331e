//! Data operations: reads, writes, batches and raw statements.

use crate::db::{ConnectionRegistry, DbPool, DbTransaction, QueryExecutor};
use crate::dialect::{Dialect, SqlDialect};
use crate::error::{DbError, DbResult};
use crate::models::{BatchResult, ColumnTypes, Conditions, PaginatedResult, QueryParam, Row};
use crate::ops::{execute_atomically, param_values, require_table};
use futures_util::future::join_all;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct DataOperations {
    registry: ConnectionRegistry,
    executor: QueryExecutor,
}

impl DataOperations {
    pub fn new(registry: ConnectionRegistry, executor: QueryExecutor) -> Self {
        Self { registry, executor }
    }

    async fn resolve(&self, connection: &str, table: &str) -> DbResult<(DbPool, Dialect)> {
        require_table(table)?;
        self.registry.resolve(connection).await
    }

    async fn resolve_typed(
        &self,
        connection: &str,
        table: &str,
    ) -> DbResult<(DbPool, Dialect, ColumnTypes)> {
        let (pool, dialect) = self.resolve(connection, table).await?;
        let types = self.column_types(&pool, &dialect, table).await?;
        Ok((pool, dialect, types))
    }

    /// Declared column types of `table`, fetched only for dialects that bind by type.
    async fn column_types(
        &self,
        pool: &DbPool,
        dialect: &Dialect,
        table: &str,
    ) -> DbResult<ColumnTypes> {
        if !dialect.needs_column_types() {
            return Ok(ColumnTypes::new());
        }
        let query = dialect.table_structure_query(table, None);
        let rows = self
            .executor
            .fetch(pool, &query.sql, &param_values(&query))
            .await?;
        Ok(rows
            .iter()
            .map(|row| dialect.format_column_info(row))
            .map(|column| (column.name, column.data_type))
            .collect())
    }

    /// Rows of `table` matching every condition, temporal values normalized.
    pub async fn select(
        &self,
        connection: &str,
        table: &str,
        conditions: Option<&Conditions>,
        limit: Option<u64>,
    ) -> DbResult<Vec<Row>> {
        let (pool, dialect, types) = self.resolve_typed(connection, table).await?;
        let query = dialect.select_query(table, conditions, limit, &types);
        let rows = self
            .executor
            .fetch(&pool, &query.sql, &param_values(&query))
            .await?;
        debug!(connection = %connection, table = %table, row_count = rows.len(), "Selected rows");
        Ok(rows)
    }

    /// One page of rows plus totals. The count and the page share one connection.
    pub async fn select_paginated(
        &self,
        connection: &str,
        table: &str,
        page: u64,
        page_size: u64,
        conditions: Option<&Conditions>,
    ) -> DbResult<PaginatedResult> {
        if page < 1 {
            return Err(DbError::validation("page must be at least 1"));
        }
        if page_size < 1 {
            return Err(DbError::validation("page_size must be greater than 0"));
        }
        let offset = (page - 1)
            .checked_mul(page_size)
            .ok_or_else(|| DbError::validation("page is out of range for this page_size"))?;
        let (pool, dialect, types) = self.resolve_typed(connection, table).await?;

        let count = dialect.count_query(table, conditions, &types);
        let page_query =
            dialect.paginated_select_query(table, conditions, page_size, offset, &types);

        let mut tx = DbTransaction::begin(&pool, self.executor.statement_timeout()).await?;
        let count_rows = tx.fetch(&count.sql, &param_values(&count)).await?;
        let total_records = count_rows
            .first()
            .and_then(|row| row.get("total").or_else(|| row.values().next()))
            .and_then(count_value)
            .ok_or_else(|| DbError::unexpected("COUNT query returned no total"))?;
        let mut data = tx.fetch(&page_query.sql, &param_values(&page_query)).await?;
        tx.commit().await?;

        if let Some(helper) = dialect.pagination_helper_column() {
            for row in &mut data {
                row.shift_remove(helper);
            }
        }

        Ok(PaginatedResult {
            data,
            page,
            page_size,
            total_pages: PaginatedResult::page_count(total_records, page_size),
            total_records,
        })
    }

    pub async fn insert(&self, connection: &str, table: &str, data: &Row) -> DbResult<()> {
        require_data(data)?;
        let (pool, dialect, types) = self.resolve_typed(connection, table).await?;
        let query = dialect.insert_query(table, data, &types);
        execute_atomically(&pool, self.executor.statement_timeout(), connection, &[query]).await?;
        debug!(connection = %connection, table = %table, "Inserted row");
        Ok(())
    }

    /// Without conditions every row of the table is updated.
    pub async fn update(
        &self,
        connection: &str,
        table: &str,
        data: &Row,
        conditions: Option<&Conditions>,
    ) -> DbResult<u64> {
        require_data(data)?;
        let (pool, dialect, types) = self.resolve_typed(connection, table).await?;
        let query = dialect.update_query(table, data, conditions, &types);
        let rows_affected =
            execute_atomically(&pool, self.executor.statement_timeout(), connection, &[query])
                .await?;
        debug!(connection = %connection, table = %table, rows_affected = rows_affected, "Updated rows");
        Ok(rows_affected)
    }

    /// Without conditions every row of the table is deleted.
    pub async fn delete(
        &self,
        connection: &str,
        table: &str,
        conditions: Option<&Conditions>,
    ) -> DbResult<u64> {
        let (pool, dialect, types) = self.resolve_typed(connection, table).await?;
        let query = dialect.delete_query(table, conditions, &types);
        let rows_affected =
            execute_atomically(&pool, self.executor.statement_timeout(), connection, &[query])
                .await?;
        debug!(connection = %connection, table = %table, rows_affected = rows_affected, "Deleted rows");
        Ok(rows_affected)
    }

    /// Insert records one at a time, each in its own transaction.
    pub async fn batch_insert(
        &self,
        connection: &str,
        table: &str,
        records: &[Row],
    ) -> DbResult<BatchResult> {
        self.resolve(connection, table).await?;

        let mut result = BatchResult::default();
        for (index, record) in records.iter().enumerate() {
            match self.insert(connection, table, record).await {
                Ok(()) => result.record_success(),
                Err(e) => result.record_failure(index, JsonValue::Object(record.clone()), e),
            }
        }
        log_batch("insert", connection, table, &result);
        Ok(result)
    }

    /// Like [`DataOperations::batch_insert`], with every insert dispatched concurrently.
    pub async fn batch_insert_concurrent(
        &self,
        connection: &str,
        table: &str,
        records: &[Row],
    ) -> DbResult<BatchResult> {
        self.resolve(connection, table).await?;

        let outcomes = join_all(
            records
                .iter()
                .map(|record| self.insert(connection, table, record)),
        )
        .await;

        let mut result = BatchResult::default();
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(()) => result.record_success(),
                Err(e) => {
                    result.record_failure(index, JsonValue::Object(records[index].clone()), e)
                }
            }
        }
        log_batch("concurrent insert", connection, table, &result);
        Ok(result)
    }

    /// Pairwise updates. Mismatched list lengths fail before anything runs.
    pub async fn batch_update(
        &self,
        connection: &str,
        table: &str,
        data_list: &[Row],
        conditions_list: &[Conditions],
    ) -> DbResult<BatchResult> {
        if data_list.len() != conditions_list.len() {
            return Err(DbError::arity_mismatch(
                data_list.len(),
                conditions_list.len(),
            ));
        }
        self.resolve(connection, table).await?;

        let mut result = BatchResult::default();
        result.add_affected(0);
        for (index, (data, conditions)) in data_list.iter().zip(conditions_list).enumerate() {
            match self.update(connection, table, data, Some(conditions)).await {
                Ok(rows) => {
                    result.record_success();
                    result.add_affected(rows);
                }
                Err(e) => {
                    let input = serde_json::json!({ "data": data, "conditions": conditions });
                    result.record_failure(index, input, e);
                }
            }
        }
        log_batch("update", connection, table, &result);
        Ok(result)
    }

    pub async fn batch_delete(
        &self,
        connection: &str,
        table: &str,
        conditions_list: &[Conditions],
    ) -> DbResult<BatchResult> {
        self.resolve(connection, table).await?;

        let mut result = BatchResult::default();
        result.add_affected(0);
        for (index, conditions) in conditions_list.iter().enumerate() {
            match self.delete(connection, table, Some(conditions)).await {
                Ok(rows) => {
                    result.record_success();
                    result.add_affected(rows);
                }
                Err(e) => {
                    result.record_failure(index, JsonValue::Object(conditions.clone()), e)
                }
            }
        }
        log_batch("delete", connection, table, &result);
        Ok(result)
    }

    /// Run caller SQL with positional parameters.
    ///
    /// With `commit` the statement runs in a transaction that is committed;
    /// otherwise it runs directly on the pool.
    pub async fn execute_raw_query(
        &self,
        connection: &str,
        sql: &str,
        params: &[JsonValue],
        commit: bool,
    ) -> DbResult<Vec<Row>> {
        if sql.trim().is_empty() {
            return Err(DbError::validation("sql must not be empty"));
        }
        let (pool, _) = self.registry.resolve(connection).await?;
        let params: Vec<QueryParam> = params.iter().map(QueryParam::from).collect();

        if !commit {
            return self.executor.fetch(&pool, sql, &params).await;
        }

        let mut tx = DbTransaction::begin(&pool, self.executor.statement_timeout()).await?;
        match tx.fetch(sql, &params).await {
            Ok(rows) => {
                tx.commit().await?;
                Ok(rows)
            }
            Err(e) => {
                if let Err(rollback_error) = tx.rollback().await {
                    warn!(connection = %connection, error = %rollback_error, "Rollback failed");
                }
                Err(e)
            }
        }
    }
}

fn require_data(data: &Row) -> DbResult<()> {
    if data.is_empty() {
        return Err(DbError::validation("data must contain at least one column"));
    }
    Ok(())
}

/// COUNT results come back as numbers, or as decimal text from some drivers.
fn count_value(value: &JsonValue) -> Option<u64> {
    match value {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn log_batch(kind: &str, connection: &str, table: &str, result: &BatchResult) {
    info!(
        connection = %connection,
        table = %table,
        success_count = result.success_count,
        failure_count = result.failure_count,
        "Batch {kind} finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_count_value() {
        assert_eq!(count_value(&json!(12)), Some(12));
        assert_eq!(count_value(&json!("7")), Some(7));
        assert_eq!(count_value(&json!(null)), None);
        assert_eq!(count_value(&json!(-1)), None);
    }

    #[test]
    fn test_require_data() {
        assert!(require_data(&Row::new()).is_err());
        let mut row = Row::new();
        row.insert("a".into(), json!(1));
        assert!(require_data(&row).is_ok());
    }

    #[tokio::test]
    async fn test_batch_update_arity_checked_first() {
        let ops = DataOperations::new(ConnectionRegistry::new(), QueryExecutor::new());
        let err = ops
            .batch_update("nowhere", "t", &[Row::new()], &[Conditions::new(), Conditions::new()])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ArityMismatch { .. }));
    }

    #[tokio::test]
    async fn test_page_offset_overflow_is_rejected() {
        let ops = DataOperations::new(ConnectionRegistry::new(), QueryExecutor::new());
        let err = ops
            .select_paginated("nowhere", "t", 1 << 33, 1 << 32, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation { .. }));
    }
}
