//! PostgreSQL dialect.

use super::{Binder, RowCells, SqlDialect, column_info, glob_to_like, network_url, parse_datetime_literal};
use crate::error::DbResult;
use crate::models::{
    AlterOperation, BoundQuery, ColumnDefinition, ColumnInfo, ColumnTypes, DatabaseType,
    QueryParam, Row,
};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostgresDialect;

impl PostgresDialect {
    fn column_comment(&self, table: &str, column: &ColumnDefinition) -> Option<String> {
        column.comment.as_ref().map(|comment| {
            format!(
                "COMMENT ON COLUMN {}.{} IS {}",
                self.quote_identifier(table),
                self.quote_identifier(&column.name),
                self.string_literal(comment)
            )
        })
    }
}

impl SqlDialect for PostgresDialect {
    fn engine(&self) -> DatabaseType {
        DatabaseType::PostgreSQL
    }

    fn connection_string(
        &self,
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        database: &str,
    ) -> DbResult<String> {
        network_url("postgres", host, port, username, password, database).map(String::from)
    }

    /// Unquoted PostgreSQL identifiers fold to lower case.
    fn quote_part(&self, part: &str) -> String {
        format!("\"{}\"", part.to_lowercase().replace('"', "\"\""))
    }

    fn placeholder(&self, _name: &str, position: usize) -> String {
        format!("${position}")
    }

    fn list_tables_query(&self, pattern: Option<&str>) -> BoundQuery {
        let mut binder = Binder::new(self);
        let mut sql = String::from(
            "SELECT c.relname::text AS table_name, d.description AS table_comment \
             FROM pg_class c \
             JOIN pg_namespace n ON n.oid = c.relnamespace \
             LEFT JOIN pg_description d ON d.objoid = c.oid AND d.objsubid = 0 \
             WHERE c.relkind IN ('r', 'p') AND n.nspname = 'public'",
        );
        if let Some(pattern) = pattern {
            let placeholder = binder.bind("pattern", glob_to_like(pattern).into());
            sql.push_str(&format!(" AND c.relname LIKE {placeholder}"));
        }
        sql.push_str(" ORDER BY c.relname");
        binder.finish(sql)
    }

    fn table_structure_query(&self, table: &str, column_pattern: Option<&str>) -> BoundQuery {
        let mut binder = Binder::new(self);
        let table_param = binder.bind("table_name", table.to_lowercase().into());
        let mut sql = format!(
            "SELECT column_name::text, data_type::text, is_nullable::text, \
             column_default::text, character_maximum_length::int4 \
             FROM information_schema.columns \
             WHERE table_schema = 'public' AND table_name = {table_param}"
        );
        if let Some(pattern) = column_pattern {
            let placeholder = binder.bind("column_pattern", glob_to_like(pattern).into());
            sql.push_str(&format!(" AND column_name LIKE {placeholder}"));
        }
        sql.push_str(" ORDER BY ordinal_position");
        binder.finish(sql)
    }

    // column_name, data_type, is_nullable, column_default, character_maximum_length
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
            statements.push(format!(
                "COMMENT ON TABLE {} IS {}",
                self.quote_identifier(table),
                self.string_literal(comment)
            ));
        }
        statements.extend(columns.iter().filter_map(|c| self.column_comment(table, c)));
        statements
    }

    fn drop_table_statement(&self, table: &str, cascade: bool) -> String {
        let mut sql = format!("DROP TABLE {}", self.quote_identifier(table));
        if cascade {
            sql.push_str(" CASCADE");
        }
        sql
    }

    /// `modify_column` expands to one statement per changed attribute.
    fn alter_table_statement(
        &self,
        table: &str,
        operation: &AlterOperation,
    ) -> DbResult<Vec<String>> {
        let quoted = self.quote_identifier(table);
        let statements = match operation {
            AlterOperation::AddColumn { column } => {
                let mut statements = vec![format!(
                    "ALTER TABLE {quoted} ADD COLUMN {}",
                    self.column_definition(column)
                )];
                statements.extend(self.column_comment(table, column));
                statements
            }
            AlterOperation::DropColumn { name } => vec![format!(
                "ALTER TABLE {quoted} DROP COLUMN {}",
                self.quote_identifier(name)
            )],
            AlterOperation::ModifyColumn { column } => {
                let name = self.quote_identifier(&column.name);
                let mut statements = vec![
                    format!(
                        "ALTER TABLE {quoted} ALTER COLUMN {name} TYPE {}",
                        column.type_with_length()
                    ),
                    format!(
                        "ALTER TABLE {quoted} ALTER COLUMN {name} {} NOT NULL",
                        if column.nullable { "DROP" } else { "SET" }
                    ),
                ];
                match &column.default {
                    Some(JsonValue::Null) => {
                        statements.push(format!("ALTER TABLE {quoted} ALTER COLUMN {name} DROP DEFAULT"))
                    }
                    Some(value) => statements.push(format!(
                        "ALTER TABLE {quoted} ALTER COLUMN {name} SET DEFAULT {}",
                        self.default_literal(value)
                    )),
                    None => {}
                }
                statements.extend(self.column_comment(table, column));
                statements
            }
            AlterOperation::RenameColumn {
                old_name, new_name, ..
            } => vec![format!(
                "ALTER TABLE {quoted} RENAME COLUMN {} TO {}",
                self.quote_identifier(old_name),
                self.quote_identifier(new_name)
            )],
        };
        Ok(statements)
    }

    fn needs_column_types(&self) -> bool {
        true
    }

    /// Text parameters do not coerce to temporal columns, so datetime
    /// strings bound for a date or timestamp column become timestamps.
    fn bind_value(&self, value: &JsonValue, column_type: Option<&str>) -> QueryParam {
        let temporal = column_type.is_some_and(ColumnTypes::is_temporal);
        match value.as_str().filter(|_| temporal).and_then(parse_datetime_literal) {
            Some(ts) => QueryParam::Timestamp(ts),
            None => QueryParam::from(value),
        }
    }

    fn bind_condition(&self, value: &JsonValue, column_type: Option<&str>) -> QueryParam {
        self.bind_value(value, column_type)
    }
}
