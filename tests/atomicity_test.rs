//! Transactional atomicity of schema changes.
//!
//! Tests verify that:
//! - Supported alter steps produce the expected columns (SQLite add_column)
//! - A failing step rolls back every earlier step of the same alterTable call
//! - Unsupported steps are rejected, never silently skipped
//! - A failed CREATE TABLE leaves no table behind

use multidb_mcp_server::DatabaseFacade;
use multidb_mcp_server::db::{ConnectionRegistry, QueryExecutor};
use multidb_mcp_server::models::{AlterOperation, ColumnDefinition, ColumnInfo, ConnectionDescriptor};
use serde_json::json;
use tempfile::TempDir;

const CONN: &str = "atomic";

async fn setup() -> (TempDir, DatabaseFacade) {
    let dir = tempfile::tempdir().unwrap();
    let facade = DatabaseFacade::new(ConnectionRegistry::new(), QueryExecutor::new());
    let descriptor = ConnectionDescriptor::from_value(
        0,
        &json!({
            "name": CONN,
            "type": "sqlite",
            "database": dir.path().join("atomic.db"),
            "enabled": true
        }),
    )
    .unwrap();
    assert!(facade.add_connection(&descriptor).await);

    let columns = vec![
        ColumnDefinition::new("id", "INTEGER").primary_key(),
        ColumnDefinition::new("name", "TEXT").not_null(),
    ];
    assert!(facade.create_table(CONN, "people", &columns, None).await);
    (dir, facade)
}

async fn column_names(facade: &DatabaseFacade) -> Vec<String> {
    facade
        .describe_table(CONN, "people", None)
        .await
        .unwrap()
        .into_iter()
        .map(|c: ColumnInfo| c.name)
        .collect()
}

fn add(name: &str, data_type: &str) -> AlterOperation {
    AlterOperation::AddColumn {
        column: ColumnDefinition::new(name, data_type),
    }
}

#[tokio::test]
async fn test_add_columns_apply() {
    let (_dir, facade) = setup().await;
    let operations = vec![
        add("age", "INTEGER"),
        AlterOperation::AddColumn {
            column: ColumnDefinition::new("city", "TEXT").with_default(json!("unknown")),
        },
    ];
    assert!(facade.alter_table(CONN, "people", &operations).await);
    assert_eq!(column_names(&facade).await, vec!["id", "name", "age", "city"]);

    let info = facade
        .describe_table(CONN, "people", Some("city"))
        .await
        .unwrap();
    assert_eq!(info[0].default, json!("'unknown'"));
}

#[tokio::test]
async fn test_failing_step_rolls_back_whole_alter() {
    let (_dir, facade) = setup().await;
    let before = column_names(&facade).await;

    // The second step collides with an existing column
    let operations = vec![add("age", "INTEGER"), add("name", "TEXT"), add("email", "TEXT")];
    assert!(!facade.alter_table(CONN, "people", &operations).await);

    assert_eq!(column_names(&facade).await, before);
}

#[tokio::test]
async fn test_unsupported_steps_are_rejected() {
    let (_dir, facade) = setup().await;
    let before = column_names(&facade).await;

    for operation in [
        AlterOperation::DropColumn {
            name: "name".to_string(),
        },
        AlterOperation::ModifyColumn {
            column: ColumnDefinition::new("name", "INTEGER"),
        },
        AlterOperation::RenameColumn {
            old_name: "name".to_string(),
            new_name: "full_name".to_string(),
            data_type: None,
        },
    ] {
        assert!(
            !facade
                .alter_table(CONN, "people", &[add("extra", "TEXT"), operation])
                .await
        );
    }

    assert_eq!(column_names(&facade).await, before);
}

#[tokio::test]
async fn test_failed_create_leaves_nothing() {
    let (_dir, facade) = setup().await;

    // Two PRIMARY KEY clauses make SQLite reject the statement
    let columns = vec![
        ColumnDefinition::new("a", "INTEGER").primary_key(),
        ColumnDefinition::new("b", "INTEGER").primary_key(),
    ];
    assert!(!facade.create_table(CONN, "broken", &columns, None).await);
    assert_eq!(
        facade.list_tables(CONN, None).await.unwrap(),
        vec!["people"]
    );
}

#[tokio::test]
async fn test_drop_table_is_transactional() {
    let (_dir, facade) = setup().await;
    assert!(!facade.drop_table(CONN, "ghost", false).await);
    assert!(facade.drop_table(CONN, "people", true).await);
    assert!(facade.list_tables(CONN, None).await.unwrap().is_empty());
}
