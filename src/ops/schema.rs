//! Schema operations: table listing, introspection and DDL.

use crate::db::{ConnectionRegistry, QueryExecutor};
use crate::dialect::{RowCells, SqlDialect};
use crate::error::{DbError, DbResult};
use crate::models::{AlterOperation, BoundQuery, ColumnDefinition, ColumnInfo};
use crate::ops::{execute_atomically, param_values, require_table};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct SchemaOperations {
    registry: ConnectionRegistry,
    executor: QueryExecutor,
}

impl SchemaOperations {
    pub fn new(registry: ConnectionRegistry, executor: QueryExecutor) -> Self {
        Self { registry, executor }
    }

    /// Table names, formatted as `table(comment)` where the engine reports a comment.
    pub async fn list_tables(&self, connection: &str, pattern: Option<&str>) -> DbResult<Vec<String>> {
        let (pool, dialect) = self.registry.resolve(connection).await?;
        let query = dialect.list_tables_query(pattern);
        let rows = self
            .executor
            .fetch(&pool, &query.sql, &param_values(&query))
            .await?;

        let tables: Vec<String> = rows
            .iter()
            .map(|row| {
                let cells = RowCells::new(row);
                let name = cells.text(0);
                let comment = cells.text(1);
                if comment.trim().is_empty() {
                    name
                } else {
                    format!("{name}({comment})")
                }
            })
            .collect();

        debug!(connection = %connection, count = tables.len(), "Listed tables");
        Ok(tables)
    }

    /// Column details of `table`, optionally filtered by a column-name glob.
    pub async fn describe_table(
        &self,
        connection: &str,
        table: &str,
        column_pattern: Option<&str>,
    ) -> DbResult<Vec<ColumnInfo>> {
        require_table(table)?;
        let (pool, dialect) = self.registry.resolve(connection).await?;
        let query = dialect.table_structure_query(table, column_pattern);
        let rows = self
            .executor
            .fetch(&pool, &query.sql, &param_values(&query))
            .await?;
        Ok(rows.iter().map(|row| dialect.format_column_info(row)).collect())
    }

    /// CREATE TABLE plus any comment statements, in one transaction.
    pub async fn create_table(
        &self,
        connection: &str,
        table: &str,
        columns: &[ColumnDefinition],
        comment: Option<&str>,
    ) -> DbResult<()> {
        require_table(table)?;
        if columns.is_empty() {
            return Err(DbError::validation("create_table requires at least one column"));
        }
        if let Some(column) = columns.iter().find(|c| c.name.trim().is_empty()) {
            return Err(DbError::validation(format!(
                "column of type {} has an empty name",
                column.data_type
            )));
        }

        let (pool, dialect) = self.registry.resolve(connection).await?;
        let mut statements = vec![BoundQuery::new(
            dialect.create_table_statement(table, columns, comment),
        )];
        statements.extend(
            dialect
                .comment_statements(table, columns, comment)
                .into_iter()
                .map(BoundQuery::new),
        );

        execute_atomically(&pool, self.executor.statement_timeout(), connection, &statements)
            .await?;
        info!(connection = %connection, table = %table, columns = columns.len(), "Table created");
        Ok(())
    }

    pub async fn drop_table(&self, connection: &str, table: &str, cascade: bool) -> DbResult<()> {
        require_table(table)?;
        let (pool, dialect) = self.registry.resolve(connection).await?;
        let statement = BoundQuery::new(dialect.drop_table_statement(table, cascade));

        execute_atomically(&pool, self.executor.statement_timeout(), connection, &[statement])
            .await?;
        info!(connection = %connection, table = %table, cascade = cascade, "Table dropped");
        Ok(())
    }

    /// Apply every alter step in one transaction: all of them or none.
    ///
    /// Statement generation happens up front, so an unsupported step fails
    /// the call before anything is executed.
    pub async fn alter_table(
        &self,
        connection: &str,
        table: &str,
        operations: &[AlterOperation],
    ) -> DbResult<()> {
        require_table(table)?;
        if operations.is_empty() {
            return Err(DbError::validation("alter_table requires at least one operation"));
        }

        let (pool, dialect) = self.registry.resolve(connection).await?;
        let mut statements = Vec::new();
        for operation in operations {
            statements.extend(
                dialect
                    .alter_table_statement(table, operation)?
                    .into_iter()
                    .map(BoundQuery::new),
            );
        }

        execute_atomically(&pool, self.executor.statement_timeout(), connection, &statements)
            .await?;
        info!(
            connection = %connection,
            table = %table,
            operations = operations.len(),
            "Table altered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolOptions;
    use crate::models::{ConnectionDescriptor, DatabaseType};

    async fn setup() -> (tempfile::TempDir, SchemaOperations) {
        let dir = tempfile::tempdir().unwrap();
        let registry = ConnectionRegistry::new();
        let descriptor = ConnectionDescriptor {
            name: "local".to_string(),
            db_type: DatabaseType::SQLite,
            host: None,
            port: None,
            username: None,
            password: None,
            database: dir.path().join("schema.db").display().to_string(),
            enabled: true,
            pool_options: PoolOptions::default(),
        };
        registry.try_add(&descriptor).await.unwrap();
        (dir, SchemaOperations::new(registry, QueryExecutor::new()))
    }

    fn columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("name", "TEXT").not_null(),
        ]
    }

    #[tokio::test]
    async fn test_create_list_describe_drop() {
        let (_dir, ops) = setup().await;
        ops.create_table("local", "people", &columns(), None)
            .await
            .unwrap();

        assert_eq!(ops.list_tables("local", None).await.unwrap(), vec!["people"]);
        assert!(ops.list_tables("local", Some("x*")).await.unwrap().is_empty());

        let info = ops.describe_table("local", "people", None).await.unwrap();
        assert_eq!(info.len(), 2);
        assert_eq!(info[0].name, "id");
        assert!(!info[1].nullable);

        let filtered = ops.describe_table("local", "people", Some("na*")).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "name");

        ops.drop_table("local", "people", false).await.unwrap();
        assert!(ops.list_tables("local", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_connection() {
        let (_dir, ops) = setup().await;
        let err = ops.list_tables("missing", None).await.unwrap_err();
        assert!(matches!(err, DbError::ConnectionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_columns() {
        let (_dir, ops) = setup().await;
        let err = ops.create_table("local", "t", &[], None).await.unwrap_err();
        assert!(matches!(err, DbError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_unsupported_alter_runs_nothing() {
        let (_dir, ops) = setup().await;
        ops.create_table("local", "t", &columns(), None).await.unwrap();

        let operations = vec![
            AlterOperation::AddColumn {
                column: ColumnDefinition::new("age", "INTEGER"),
            },
            AlterOperation::DropColumn {
                name: "name".to_string(),
            },
        ];
        let err = ops.alter_table("local", "t", &operations).await.unwrap_err();
        assert!(matches!(err, DbError::UnsupportedOperation { .. }));

        let info = ops.describe_table("local", "t", None).await.unwrap();
        assert_eq!(info.len(), 2);
    }
}
