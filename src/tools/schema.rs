//! Schema tools.
//!
//! This module implements `listTables`, `describeTable`, `createTable`,
//! `dropTable` and `alterTable`.

use crate::error::{DbError, DbResult};
use crate::facade::DatabaseFacade;
use crate::models::{AlterOperation, ColumnDefinition, ColumnInfo};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Input for the listTables tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListTablesInput {
    /// Connection name from listConnections
    pub connection_name: String,
    /// Optional table-name filter with `*` and `?` wildcards
    #[serde(default)]
    pub pattern: Option<String>,
}

/// Output from the listTables tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListTablesOutput {
    /// Table names, as `table(comment)` where a comment exists
    pub tables: Vec<String>,
    pub count: usize,
}

/// Input for the describeTable tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DescribeTableInput {
    pub connection_name: String,
    pub table_name: String,
    /// Optional column-name filter with `*` and `?` wildcards
    #[serde(default)]
    pub column_pattern: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DescribeTableOutput {
    pub table_name: String,
    pub columns: Vec<ColumnInfo>,
}

/// Input for the createTable tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateTableInput {
    pub connection_name: String,
    pub table_name: String,
    /// Column definitions: name, type, length, nullable, primary_key, default, comment
    pub columns: Vec<ColumnDefinition>,
    /// Table comment, where the engine supports one
    #[serde(default)]
    pub table_comment: Option<String>,
}

/// Input for the dropTable tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DropTableInput {
    pub connection_name: String,
    pub table_name: String,
    /// Also drop dependent objects (ignored by SQLite and SQL Server)
    #[serde(default)]
    pub cascade: bool,
}

/// Input for the alterTable tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AlterTableInput {
    pub connection_name: String,
    pub table_name: String,
    /// Steps applied in order, all or nothing. Each has an `operation` tag:
    /// add_column, drop_column, modify_column or rename_column.
    pub operations: Vec<AlterOperation>,
}

/// Outcome of a DDL tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SchemaChangeOutput {
    pub success: bool,
    pub message: String,
}

impl SchemaChangeOutput {
    fn from_outcome(success: bool, action: &str, table: &str) -> Self {
        let message = if success {
            format!("Table '{table}' {action}")
        } else {
            format!("Table '{table}' was not {action}; the change was rolled back (see server logs)")
        };
        Self { success, message }
    }
}

pub struct SchemaToolHandler {
    facade: Arc<DatabaseFacade>,
}

impl SchemaToolHandler {
    pub fn new(facade: Arc<DatabaseFacade>) -> Self {
        Self { facade }
    }

    pub async fn list_tables(&self, input: ListTablesInput) -> DbResult<ListTablesOutput> {
        let tables = self
            .facade
            .list_tables(&input.connection_name, input.pattern.as_deref())
            .await
            .ok_or_else(|| failed("list tables", &input.connection_name))?;
        Ok(ListTablesOutput {
            count: tables.len(),
            tables,
        })
    }

    pub async fn describe_table(&self, input: DescribeTableInput) -> DbResult<DescribeTableOutput> {
        let columns = self
            .facade
            .describe_table(
                &input.connection_name,
                &input.table_name,
                input.column_pattern.as_deref(),
            )
            .await
            .ok_or_else(|| failed("describe table", &input.connection_name))?;
        Ok(DescribeTableOutput {
            table_name: input.table_name,
            columns,
        })
    }

    pub async fn create_table(&self, input: CreateTableInput) -> DbResult<SchemaChangeOutput> {
        let success = self
            .facade
            .create_table(
                &input.connection_name,
                &input.table_name,
                &input.columns,
                input.table_comment.as_deref(),
            )
            .await;
        Ok(SchemaChangeOutput::from_outcome(success, "created", &input.table_name))
    }

    pub async fn drop_table(&self, input: DropTableInput) -> DbResult<SchemaChangeOutput> {
        let success = self
            .facade
            .drop_table(&input.connection_name, &input.table_name, input.cascade)
            .await;
        Ok(SchemaChangeOutput::from_outcome(success, "dropped", &input.table_name))
    }

    pub async fn alter_table(&self, input: AlterTableInput) -> DbResult<SchemaChangeOutput> {
        let success = self
            .facade
            .alter_table(&input.connection_name, &input.table_name, &input.operations)
            .await;
        Ok(SchemaChangeOutput::from_outcome(success, "altered", &input.table_name))
    }
}

/// Error for a read that came back empty-handed from the facade.
pub(crate) fn failed(operation: &str, connection: &str) -> DbError {
    DbError::unexpected(format!(
        "{operation} failed on connection '{connection}'; see server logs for details"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_change_message() {
        let ok = SchemaChangeOutput::from_outcome(true, "created", "users");
        assert_eq!(ok.message, "Table 'users' created");

        let failed = SchemaChangeOutput::from_outcome(false, "dropped", "users");
        assert!(!failed.success);
        assert!(failed.message.contains("rolled back"));
    }

    #[test]
    fn test_alter_input_parses_tagged_operations() {
        let input: AlterTableInput = serde_json::from_value(serde_json::json!({
            "connection_name": "main",
            "table_name": "users",
            "operations": [
                {"operation": "add_column", "name": "age", "type": "INTEGER"},
                {"operation": "rename_column", "old_name": "nick", "new_name": "alias"}
            ]
        }))
        .unwrap();
        assert_eq!(input.operations.len(), 2);
        assert_eq!(input.operations[1].kind(), "rename_column");
    }
}
