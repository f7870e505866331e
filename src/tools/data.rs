//! Data tools.
//!
//! This module implements `select`, `selectPaginated`, `insert`, `update`,
//! `delete`, their batch variants and `executeRawQuery`.

use crate::error::{DbError, DbResult};
use crate::facade::DatabaseFacade;
use crate::models::{BatchResult, Conditions, PaginatedResult, Row};
use crate::tools::schema::failed;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: u64 = 20;

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

/// Input for the select tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SelectInput {
    /// Connection name from listConnections
    pub connection_name: String,
    pub table_name: String,
    /// Column equality filters, AND-ed together. Omit to read every row.
    #[serde(default)]
    pub conditions: Option<Conditions>,
    /// Maximum number of rows to return
    #[serde(default)]
    pub limit: Option<u64>,
}

/// Rows returned by select and executeRawQuery.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RowsOutput {
    /// Rows as column-to-value objects; temporal values use `YYYY-MM-DD HH:MM:SS`
    pub rows: Vec<Row>,
    pub row_count: usize,
}

impl From<Vec<Row>> for RowsOutput {
    fn from(rows: Vec<Row>) -> Self {
        Self {
            row_count: rows.len(),
            rows,
        }
    }
}

/// Input for the selectPaginated tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SelectPaginatedInput {
    pub connection_name: String,
    pub table_name: String,
    /// 1-based page number. Default: 1
    #[serde(default = "default_page")]
    pub page: u64,
    /// Rows per page. Default: 20
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    #[serde(default)]
    pub conditions: Option<Conditions>,
}

/// Input for the insert tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct InsertInput {
    pub connection_name: String,
    pub table_name: String,
    /// Column-to-value object for the new row
    pub data: Row,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct InsertOutput {
    pub success: bool,
}

/// Input for the batchInsert tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct BatchInsertInput {
    pub connection_name: String,
    pub table_name: String,
    /// Rows to insert; each one is its own transaction
    pub data_list: Vec<Row>,
    /// Dispatch the inserts concurrently instead of one after another
    #[serde(default)]
    pub concurrent: bool,
}

/// Input for the update tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateInput {
    pub connection_name: String,
    pub table_name: String,
    /// Columns to set
    pub data: Row,
    /// Rows to update. Omit to update EVERY row of the table.
    #[serde(default)]
    pub conditions: Option<Conditions>,
}

/// Affected-row count of update and delete.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RowsAffectedOutput {
    pub success: bool,
    /// Number of affected rows, -1 when the statement failed
    pub rows_affected: i64,
}

impl From<i64> for RowsAffectedOutput {
    fn from(rows_affected: i64) -> Self {
        Self {
            success: rows_affected >= 0,
            rows_affected,
        }
    }
}

/// Input for the batchUpdate tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct BatchUpdateInput {
    pub connection_name: String,
    pub table_name: String,
    /// Values to set, paired by position with conditions_list
    pub data_list: Vec<Row>,
    /// Must have the same length as data_list
    pub conditions_list: Vec<Conditions>,
}

/// Input for the delete tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DeleteInput {
    pub connection_name: String,
    pub table_name: String,
    /// Rows to delete. Omit to delete EVERY row of the table.
    #[serde(default)]
    pub conditions: Option<Conditions>,
}

/// Input for the batchDelete tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct BatchDeleteInput {
    pub connection_name: String,
    pub table_name: String,
    pub conditions_list: Vec<Conditions>,
}

/// Input for the executeRawQuery tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExecuteRawQueryInput {
    pub connection_name: String,
    /// SQL text using the engine's placeholder syntax (`?`, `$1`, `:1` or `@P1`)
    pub sql: String,
    /// Positional parameter values
    #[serde(default)]
    pub params: Vec<JsonValue>,
    /// Run inside a transaction and commit it
    #[serde(default)]
    pub commit: bool,
}

pub struct DataToolHandler {
    facade: Arc<DatabaseFacade>,
}

impl DataToolHandler {
    pub fn new(facade: Arc<DatabaseFacade>) -> Self {
        Self { facade }
    }

    pub async fn select(&self, input: SelectInput) -> DbResult<RowsOutput> {
        self.facade
            .select(
                &input.connection_name,
                &input.table_name,
                input.conditions.as_ref(),
                input.limit,
            )
            .await
            .map(RowsOutput::from)
            .ok_or_else(|| failed("select", &input.connection_name))
    }

    pub async fn select_paginated(&self, input: SelectPaginatedInput) -> DbResult<PaginatedResult> {
        if input.page == 0 || input.page_size == 0 {
            return Err(DbError::validation("page and page_size must both be at least 1"));
        }
        self.facade
            .select_paginated(
                &input.connection_name,
                &input.table_name,
                input.page,
                input.page_size,
                input.conditions.as_ref(),
            )
            .await
            .ok_or_else(|| failed("paginated select", &input.connection_name))
    }

    pub async fn insert(&self, input: InsertInput) -> DbResult<InsertOutput> {
        let success = self
            .facade
            .insert(&input.connection_name, &input.table_name, &input.data)
            .await;
        Ok(InsertOutput { success })
    }

    pub async fn batch_insert(&self, input: BatchInsertInput) -> DbResult<BatchResult> {
        self.facade
            .batch_insert(
                &input.connection_name,
                &input.table_name,
                &input.data_list,
                input.concurrent,
            )
            .await
            .ok_or_else(|| failed("batch insert", &input.connection_name))
    }

    pub async fn update(&self, input: UpdateInput) -> DbResult<RowsAffectedOutput> {
        let rows = self
            .facade
            .update(
                &input.connection_name,
                &input.table_name,
                &input.data,
                input.conditions.as_ref(),
            )
            .await;
        Ok(rows.into())
    }

    pub async fn batch_update(&self, input: BatchUpdateInput) -> DbResult<BatchResult> {
        self.facade
            .batch_update(
                &input.connection_name,
                &input.table_name,
                &input.data_list,
                &input.conditions_list,
            )
            .await?
            .ok_or_else(|| failed("batch update", &input.connection_name))
    }

    pub async fn delete(&self, input: DeleteInput) -> DbResult<RowsAffectedOutput> {
        let rows = self
            .facade
            .delete(
                &input.connection_name,
                &input.table_name,
                input.conditions.as_ref(),
            )
            .await;
        Ok(rows.into())
    }

    pub async fn batch_delete(&self, input: BatchDeleteInput) -> DbResult<BatchResult> {
        self.facade
            .batch_delete(
                &input.connection_name,
                &input.table_name,
                &input.conditions_list,
            )
            .await
            .ok_or_else(|| failed("batch delete", &input.connection_name))
    }

    pub async fn execute_raw_query(&self, input: ExecuteRawQueryInput) -> DbResult<RowsOutput> {
        self.facade
            .execute_raw_query(&input.connection_name, &input.sql, &input.params, input.commit)
            .await
            .map(RowsOutput::from)
            .ok_or_else(|| failed("raw query", &input.connection_name))
    }
}
