//! SQL Server dialect.
//!
//! Pagination wraps the query in a `ROW_NUMBER()` subquery instead of
//! relying on `OFFSET ... FETCH`, so it also works on servers older than
//! 2012. Comments are stored as `MS_Description` extended properties.

use super::{Binder, RowCells, SqlDialect, column_info, glob_to_like, network_url};
use crate::error::DbResult;
use crate::models::{
    AlterOperation, BoundQuery, ColumnDefinition, ColumnInfo, ColumnTypes, Conditions,
    DatabaseType, Row,
};

const ROW_NUMBER_COLUMN: &str = "__rn";
const DEFAULT_SCHEMA: &str = "dbo";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SqlServerDialect;

impl SqlServerDialect {
    fn unicode_literal(&self, value: &str) -> String {
        format!("N{}", self.string_literal(value))
    }

    fn split_schema(table: &str) -> (&str, &str) {
        table.rsplit_once('.').unwrap_or((DEFAULT_SCHEMA, table))
    }

    fn description(&self, table: &str, column: Option<&str>, comment: &str) -> String {
        let (schema, name) = Self::split_schema(table);
        let mut sql = format!(
            "EXEC sp_addextendedproperty @name = N'MS_Description', @value = {}, \
             @level0type = N'SCHEMA', @level0name = {}, @level1type = N'TABLE', @level1name = {}",
            self.unicode_literal(comment),
            self.unicode_literal(schema),
            self.unicode_literal(name)
        );
        if let Some(column) = column {
            sql.push_str(&format!(
                ", @level2type = N'COLUMN', @level2name = {}",
                self.unicode_literal(column)
            ));
        }
        sql
    }
}

impl SqlDialect for SqlServerDialect {
    fn engine(&self) -> DatabaseType {
        DatabaseType::SqlServer
    }

    fn connection_string(
        &self,
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        database: &str,
    ) -> DbResult<String> {
        network_url("mssql", host, port, username, password, database).map(String::from)
    }

    fn quote_part(&self, part: &str) -> String {
        format!("[{}]", part.replace(']', "]]"))
    }

    fn placeholder(&self, _name: &str, position: usize) -> String {
        format!("@P{position}")
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    fn list_tables_query(&self, pattern: Option<&str>) -> BoundQuery {
        let mut binder = Binder::new(self);
        let mut sql = String::from(
            "SELECT t.TABLE_NAME AS table_name, CAST(ep.value AS NVARCHAR(4000)) AS table_comment \
             FROM INFORMATION_SCHEMA.TABLES t \
             LEFT JOIN sys.extended_properties ep \
             ON ep.major_id = OBJECT_ID(QUOTENAME(t.TABLE_SCHEMA) + '.' + QUOTENAME(t.TABLE_NAME)) \
             AND ep.minor_id = 0 AND ep.name = 'MS_Description' \
             WHERE t.TABLE_TYPE = 'BASE TABLE'",
        );
        if let Some(pattern) = pattern {
            let placeholder = binder.bind("pattern", glob_to_like(pattern).into());
            sql.push_str(&format!(" AND t.TABLE_NAME LIKE {placeholder}"));
        }
        sql.push_str(" ORDER BY t.TABLE_NAME");
        binder.finish(sql)
    }

    fn table_structure_query(&self, table: &str, column_pattern: Option<&str>) -> BoundQuery {
        let mut binder = Binder::new(self);
        let (_, name) = Self::split_schema(table);
        let table_param = binder.bind("table_name", name.into());
        let mut sql = format!(
            "SELECT COLUMN_NAME, DATA_TYPE, IS_NULLABLE, COLUMN_DEFAULT, CHARACTER_MAXIMUM_LENGTH \
             FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = {table_param}"
        );
        if let Some(pattern) = column_pattern {
            let placeholder = binder.bind("column_pattern", glob_to_like(pattern).into());
            sql.push_str(&format!(" AND COLUMN_NAME LIKE {placeholder}"));
        }
        sql.push_str(" ORDER BY ORDINAL_POSITION");
        binder.finish(sql)
    }

    // COLUMN_NAME, DATA_TYPE, IS_NULLABLE, COLUMN_DEFAULT, CHARACTER_MAXIMUM_LENGTH
    fn format_column_info(&self, row: &Row) -> ColumnInfo {
        let cells = RowCells::new(row);
        column_info(
            cells.text(0),
            cells.text(1),
            cells.flag(2, "YES"),
            cells.get(3),
            [("char_length", cells.get(4))],
        )
    }

    fn comment_statements(
        &self,
        table: &str,
        columns: &[ColumnDefinition],
        comment: Option<&str>,
    ) -> Vec<String> {
        let mut statements = Vec::new();
        if let Some(comment) = comment {
            statements.push(self.description(table, None, comment));
        }
        for column in columns {
            if let Some(comment) = &column.comment {
                statements.push(self.description(table, Some(&column.name), comment));
            }
        }
        statements
    }

    /// SQL Server has no `DROP TABLE ... CASCADE`.
    fn drop_table_statement(&self, table: &str, _cascade: bool) -> String {
        format!("DROP TABLE {}", self.quote_identifier(table))
    }

    fn alter_table_statement(
        &self,
        table: &str,
        operation: &AlterOperation,
    ) -> DbResult<Vec<String>> {
        let quoted = self.quote_identifier(table);
        let statements = match operation {
            AlterOperation::AddColumn { column } => {
                let mut statements =
                    vec![format!("ALTER TABLE {quoted} ADD {}", self.column_definition(column))];
                if let Some(comment) = &column.comment {
                    statements.push(self.description(table, Some(&column.name), comment));
                }
                statements
            }
            AlterOperation::DropColumn { name } => vec![format!(
                "ALTER TABLE {quoted} DROP COLUMN {}",
                self.quote_identifier(name)
            )],
            // ALTER COLUMN cannot carry a DEFAULT; it becomes a separate constraint.
            AlterOperation::ModifyColumn { column } => {
                let name = self.quote_identifier(&column.name);
                let mut statements = vec![format!(
                    "ALTER TABLE {quoted} ALTER COLUMN {name} {} {}",
                    column.type_with_length(),
                    if column.nullable { "NULL" } else { "NOT NULL" }
                )];
                if let Some(value) = column.default.as_ref().filter(|v| !v.is_null()) {
                    statements.push(format!(
                        "ALTER TABLE {quoted} ADD DEFAULT {} FOR {name}",
                        self.default_literal(value)
                    ));
                }
                statements
            }
            AlterOperation::RenameColumn {
                old_name, new_name, ..
            } => vec![format!(
                "EXEC sp_rename {}, {}, 'COLUMN'",
                self.string_literal(&format!("{table}.{old_name}")),
                self.string_literal(new_name)
            )],
        };
        Ok(statements)
    }

    fn select_query(
        &self,
        table: &str,
        conditions: Option<&Conditions>,
        limit: Option<u64>,
        types: &ColumnTypes,
    ) -> BoundQuery {
        let mut binder = Binder::typed(self, types);
        let where_sql = binder.where_clause(conditions, "");
        let top = limit.map(|n| format!("TOP {n} ")).unwrap_or_default();
        let sql = format!(
            "SELECT {top}* FROM {}{}",
            self.quote_identifier(table),
            where_sql
        );
        binder.finish(sql)
    }

    fn paginated_select_query(
        &self,
        table: &str,
        conditions: Option<&Conditions>,
        limit: u64,
        offset: u64,
        types: &ColumnTypes,
    ) -> BoundQuery {
        let mut binder = Binder::typed(self, types);
        let where_sql = binder.where_clause(conditions, "");
        // Past u64::MAX there are no rows to number anyway
        let last = offset.saturating_add(limit);
        let sql = format!(
            "SELECT * FROM (SELECT *, ROW_NUMBER() OVER (ORDER BY (SELECT NULL)) AS {ROW_NUMBER_COLUMN} \
             FROM {}{}) AS numbered WHERE {ROW_NUMBER_COLUMN} > {offset} AND {ROW_NUMBER_COLUMN} <= {last}",
            self.quote_identifier(table),
            where_sql
        );
        binder.finish(sql)
    }

    fn pagination_helper_column(&self) -> Option<&'static str> {
        Some(ROW_NUMBER_COLUMN)
    }
}
