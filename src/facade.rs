//! Sentinel-returning entry points over the schema and data operations.
//!
//! Failures never cross this boundary as errors: writes report `false` or
//! `-1`, reads report `None`, and the full error context is logged instead.
//! The one exception is a batch update with mismatched list lengths, which
//! is rejected as a whole with [`DbError::ArityMismatch`].

use crate::db::{ConnectionRegistry, QueryExecutor};
use crate::error::{DbError, DbResult};
use crate::models::{
    AlterOperation, BatchResult, ColumnDefinition, ColumnInfo, Conditions, ConnectionDescriptor,
    DatabaseType, PaginatedResult, Row,
};
use crate::ops::{DataOperations, SchemaOperations};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tracing::error;

#[derive(Debug, Clone)]
pub struct DatabaseFacade {
    registry: ConnectionRegistry,
    schema: SchemaOperations,
    data: DataOperations,
}

impl DatabaseFacade {
    pub fn new(registry: ConnectionRegistry, executor: QueryExecutor) -> Self {
        Self {
            schema: SchemaOperations::new(registry.clone(), executor),
            data: DataOperations::new(registry.clone(), executor),
            registry,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    // Connections

    pub async fn add_connection(&self, descriptor: &ConnectionDescriptor) -> bool {
        self.registry.add(descriptor).await
    }

    pub async fn remove_connection(&self, name: &str) -> bool {
        self.registry.remove(name).await
    }

    pub async fn list_connections(&self) -> BTreeMap<String, DatabaseType> {
        self.registry.list_all().await
    }

    pub async fn has_connection(&self, name: &str) -> bool {
        self.registry.contains(name).await
    }

    // Schema

    pub async fn list_tables(&self, connection: &str, pattern: Option<&str>) -> Option<Vec<String>> {
        let result = self.schema.list_tables(connection, pattern).await;
        ok_or_log(result, "list tables", connection, None)
    }

    pub async fn describe_table(
        &self,
        connection: &str,
        table: &str,
        column_pattern: Option<&str>,
    ) -> Option<Vec<ColumnInfo>> {
        let result = self
            .schema
            .describe_table(connection, table, column_pattern)
            .await;
        ok_or_log(result, "describe table", connection, Some(table))
    }

    pub async fn create_table(
        &self,
        connection: &str,
        table: &str,
        columns: &[ColumnDefinition],
        comment: Option<&str>,
    ) -> bool {
        let result = self
            .schema
            .create_table(connection, table, columns, comment)
            .await;
        ok_or_log(result, "create table", connection, Some(table)).is_some()
    }

    pub async fn drop_table(&self, connection: &str, table: &str, cascade: bool) -> bool {
        let result = self.schema.drop_table(connection, table, cascade).await;
        ok_or_log(result, "drop table", connection, Some(table)).is_some()
    }

    pub async fn alter_table(
        &self,
        connection: &str,
        table: &str,
        operations: &[AlterOperation],
    ) -> bool {
        let result = self.schema.alter_table(connection, table, operations).await;
        ok_or_log(result, "alter table", connection, Some(table)).is_some()
    }

    // Data

    pub async fn select(
        &self,
        connection: &str,
        table: &str,
        conditions: Option<&Conditions>,
        limit: Option<u64>,
    ) -> Option<Vec<Row>> {
        let result = self.data.select(connection, table, conditions, limit).await;
        ok_or_log(result, "select", connection, Some(table))
    }

    pub async fn select_paginated(
        &self,
        connection: &str,
        table: &str,
        page: u64,
        page_size: u64,
        conditions: Option<&Conditions>,
    ) -> Option<PaginatedResult> {
        let result = self
            .data
            .select_paginated(connection, table, page, page_size, conditions)
            .await;
        ok_or_log(result, "paginated select", connection, Some(table))
    }

    pub async fn insert(&self, connection: &str, table: &str, data: &Row) -> bool {
        let result = self.data.insert(connection, table, data).await;
        ok_or_log(result, "insert", connection, Some(table)).is_some()
    }

    /// Affected rows, or `-1` on failure.
    pub async fn update(
        &self,
        connection: &str,
        table: &str,
        data: &Row,
        conditions: Option<&Conditions>,
    ) -> i64 {
        let result = self.data.update(connection, table, data, conditions).await;
        affected_or_sentinel(ok_or_log(result, "update", connection, Some(table)))
    }

    /// Affected rows, or `-1` on failure.
    pub async fn delete(&self, connection: &str, table: &str, conditions: Option<&Conditions>) -> i64 {
        let result = self.data.delete(connection, table, conditions).await;
        affected_or_sentinel(ok_or_log(result, "delete", connection, Some(table)))
    }

    pub async fn batch_insert(
        &self,
        connection: &str,
        table: &str,
        records: &[Row],
        concurrent: bool,
    ) -> Option<BatchResult> {
        let result = if concurrent {
            self.data
                .batch_insert_concurrent(connection, table, records)
                .await
        } else {
            self.data.batch_insert(connection, table, records).await
        };
        ok_or_log(result, "batch insert", connection, Some(table))
    }

    /// Rejects mismatched list lengths before touching the table.
    pub async fn batch_update(
        &self,
        connection: &str,
        table: &str,
        data_list: &[Row],
        conditions_list: &[Conditions],
    ) -> DbResult<Option<BatchResult>> {
        match self
            .data
            .batch_update(connection, table, data_list, conditions_list)
            .await
        {
            Err(e @ DbError::ArityMismatch { .. }) => Err(e),
            result => Ok(ok_or_log(result, "batch update", connection, Some(table))),
        }
    }

    pub async fn batch_delete(
        &self,
        connection: &str,
        table: &str,
        conditions_list: &[Conditions],
    ) -> Option<BatchResult> {
        let result = self
            .data
            .batch_delete(connection, table, conditions_list)
            .await;
        ok_or_log(result, "batch delete", connection, Some(table))
    }

    pub async fn execute_raw_query(
        &self,
        connection: &str,
        sql: &str,
        params: &[JsonValue],
        commit: bool,
    ) -> Option<Vec<Row>> {
        match self
            .data
            .execute_raw_query(connection, sql, params, commit)
            .await
        {
            Ok(rows) => Some(rows),
            Err(e) => {
                error!(
                    connection = %connection,
                    sql = %sql,
                    params = params.len(),
                    error = %e,
                    "Raw query failed"
                );
                None
            }
        }
    }

    pub async fn dispose_all(&self) {
        self.registry.dispose_all().await;
    }
}

fn ok_or_log<T>(
    result: DbResult<T>,
    operation: &str,
    connection: &str,
    table: Option<&str>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            error!(
                operation = operation,
                connection = %connection,
                table = table.unwrap_or_default(),
                error = %e,
                suggestion = e.suggestion().unwrap_or_default(),
                "Operation failed"
            );
            None
        }
    }
}

fn affected_or_sentinel(rows: Option<u64>) -> i64 {
    rows.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facade() -> DatabaseFacade {
        DatabaseFacade::new(ConnectionRegistry::new(), QueryExecutor::new())
    }

    #[test]
    fn test_affected_or_sentinel() {
        assert_eq!(affected_or_sentinel(Some(3)), 3);
        assert_eq!(affected_or_sentinel(None), -1);
    }

    #[tokio::test]
    async fn test_unknown_connection_yields_sentinels() {
        let facade = facade();
        let row: Row = serde_json::from_str(r#"{"id": 1}"#).unwrap();

        assert!(facade.list_tables("ghost", None).await.is_none());
        assert!(facade.select("ghost", "t", None, None).await.is_none());
        assert!(!facade.insert("ghost", "t", &row).await);
        assert_eq!(facade.update("ghost", "t", &row, None).await, -1);
        assert_eq!(facade.delete("ghost", "t", None).await, -1);
        assert!(!facade.drop_table("ghost", "t", false).await);
        assert!(facade.execute_raw_query("ghost", "SELECT 1", &[], false).await.is_none());
        assert!(facade.batch_delete("ghost", "t", &[]).await.is_none());
    }

    #[tokio::test]
    async fn test_batch_update_arity_is_an_error() {
        let facade = facade();
        let result = facade
            .batch_update("ghost", "t", &[Row::new()], &[])
            .await;
        assert!(matches!(result, Err(DbError::ArityMismatch { .. })));

        let result = facade.batch_update("ghost", "t", &[], &[]).await;
        assert!(matches!(result, Ok(None)));
    }
}
