//! SQLite dialect.
//!
//! SQLite's `ALTER TABLE` support is limited to adding columns here; the
//! other alter steps are reported as unsupported rather than emulated.

use super::{Binder, RowCells, SqlDialect, column_info, glob_to_like};
use crate::error::DbResult;
use crate::models::{AlterOperation, BoundQuery, ColumnDefinition, ColumnInfo, DatabaseType, Row};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn engine(&self) -> DatabaseType {
        DatabaseType::SQLite
    }

    /// Only the file path matters.
    fn connection_string(
        &self,
        _host: &str,
        _port: u16,
        _username: &str,
        _password: &str,
        database: &str,
    ) -> DbResult<String> {
        Ok(format!("sqlite:{database}"))
    }

    fn quote_part(&self, part: &str) -> String {
        format!("\"{}\"", part.replace('"', "\"\""))
    }

    fn placeholder(&self, _name: &str, _position: usize) -> String {
        "?".to_string()
    }

    fn list_tables_query(&self, pattern: Option<&str>) -> BoundQuery {
        let mut binder = Binder::new(self);
        let mut sql = String::from(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        );
        if let Some(pattern) = pattern {
            let placeholder = binder.bind("pattern", glob_to_like(pattern).into());
            sql.push_str(&format!(" AND name LIKE {placeholder}"));
        }
        sql.push_str(" ORDER BY name");
        binder.finish(sql)
    }

    fn table_structure_query(&self, table: &str, column_pattern: Option<&str>) -> BoundQuery {
        let mut binder = Binder::new(self);
        let table_param = binder.bind("table_name", table.into());
        let mut sql = format!(
            "SELECT cid, name, type, \"notnull\", dflt_value, pk FROM pragma_table_info({table_param})"
        );
        if let Some(pattern) = column_pattern {
            let placeholder = binder.bind("column_pattern", glob_to_like(pattern).into());
            sql.push_str(&format!(" WHERE name LIKE {placeholder}"));
        }
        sql.push_str(" ORDER BY cid");
        binder.finish(sql)
    }

    // cid, name, type, notnull, dflt_value, pk
    fn format_column_info(&self, row: &Row) -> ColumnInfo {
        let cells = RowCells::new(row);
        column_info(
            cells.text(1),
            cells.text(2),
            !cells.flag(3, "1"),
            cells.get(4),
            [("primary_key", JsonValue::Bool(cells.flag(5, "1")))],
        )
    }

    fn drop_table_statement(&self, table: &str, _cascade: bool) -> String {
        format!("DROP TABLE {}", self.quote_identifier(table))
    }

    fn alter_table_statement(
        &self,
        table: &str,
        operation: &AlterOperation,
    ) -> DbResult<Vec<String>> {
        match operation {
            AlterOperation::AddColumn { column } => {
                let column = ColumnDefinition {
                    primary_key: false,
                    ..column.clone()
                };
                Ok(vec![format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    self.quote_identifier(table),
                    self.column_definition(&column)
                )])
            }
            other => Err(self.unsupported(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use serde_json::json;

    #[test]
    fn test_connection_string_is_file_path() {
        let dsn = SqliteDialect
            .connection_string("ignored", 1, "", "", "/var/data/app.db")
            .unwrap();
        assert_eq!(dsn, "sqlite:/var/data/app.db");
    }

    #[test]
    fn test_only_add_column_is_supported() {
        let add = AlterOperation::AddColumn {
            column: ColumnDefinition::new("note", "TEXT").with_default(json!("")),
        };
        assert_eq!(
            SqliteDialect.alter_table_statement("t", &add).unwrap(),
            vec!["ALTER TABLE \"t\" ADD COLUMN \"note\" TEXT DEFAULT ''"]
        );

        let rejected = [
            AlterOperation::DropColumn { name: "note".into() },
            AlterOperation::ModifyColumn {
                column: ColumnDefinition::new("note", "INTEGER"),
            },
            AlterOperation::RenameColumn {
                old_name: "note".into(),
                new_name: "memo".into(),
                data_type: None,
            },
        ];
        for op in rejected {
            match SqliteDialect.alter_table_statement("t", &op) {
                Err(DbError::UnsupportedOperation { engine, operation }) => {
                    assert_eq!(engine, "SQLite");
                    assert_eq!(operation, op.kind());
                }
                other => panic!("expected UnsupportedOperation, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_drop_ignores_cascade() {
        assert_eq!(SqliteDialect.drop_table_statement("t", true), "DROP TABLE \"t\"");
    }

    #[test]
    fn test_structure_query_uses_pragma_function() {
        let query = SqliteDialect.table_structure_query("users", Some("na*"));
        assert_eq!(
            query.sql,
            "SELECT cid, name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?) \
             WHERE name LIKE ? ORDER BY cid"
        );
        assert_eq!(query.param_names(), vec!["table_name", "column_pattern"]);
    }

    #[test]
    fn test_format_column_info() {
        let row = json!({"cid": 0, "name": "id", "type": "INTEGER", "notnull": 1, "dflt_value": null, "pk": 1});
        let info = SqliteDialect.format_column_info(row.as_object().unwrap());
        assert_eq!(info.name, "id");
        assert!(!info.nullable);
        assert_eq!(info.extras["primary_key"], true);
    }

    #[test]
    fn test_create_table() {
        let columns = vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("name", "TEXT"),
        ];
        assert_eq!(
            SqliteDialect.create_table_statement("t", &columns, Some("ignored")),
            "CREATE TABLE \"t\" (\n  \"id\" INTEGER PRIMARY KEY,\n  \"name\" TEXT\n)"
        );
    }
}
