//! End-to-end CRUD scenarios against a fresh SQLite file.
//!
//! Tests verify that:
//! - A new SQLite file can be connected, given a table and listed
//! - insert / select / update / delete behave as single-call transactions
//! - Deleting a missing row affects zero rows rather than failing
//! - batch update rejects mismatched list lengths before touching the table

use multidb_mcp_server::DatabaseFacade;
use multidb_mcp_server::db::{ConnectionRegistry, QueryExecutor};
use multidb_mcp_server::error::DbError;
use multidb_mcp_server::models::{ColumnDefinition, Conditions, ConnectionDescriptor, Row};
use serde_json::{Value as JsonValue, json};
use tempfile::TempDir;

const CONN: &str = "test";

fn object(value: JsonValue) -> Row {
    value.as_object().cloned().unwrap()
}

/// Connect a fresh `test.db` and create table `t (id INTEGER PRIMARY KEY, name TEXT)`.
async fn setup() -> (TempDir, DatabaseFacade) {
    let dir = tempfile::tempdir().unwrap();
    let facade = DatabaseFacade::new(ConnectionRegistry::new(), QueryExecutor::new());
    let descriptor = ConnectionDescriptor::from_value(
        0,
        &json!({
            "name": CONN,
            "type": "sqlite",
            "database": dir.path().join("test.db"),
            "enabled": true
        }),
    )
    .unwrap();
    assert!(facade.add_connection(&descriptor).await);

    let columns = vec![
        ColumnDefinition::new("id", "INTEGER").primary_key(),
        ColumnDefinition::new("name", "TEXT"),
    ];
    assert!(facade.create_table(CONN, "t", &columns, None).await);
    (dir, facade)
}

#[tokio::test]
async fn test_scenario_a_create_insert_select() {
    let (_dir, facade) = setup().await;

    assert_eq!(facade.list_tables(CONN, None).await.unwrap(), vec!["t"]);
    assert!(
        facade
            .insert(CONN, "t", &object(json!({"id": 1, "name": "a"})))
            .await
    );

    let rows = facade.select(CONN, "t", None, None).await.unwrap();
    assert_eq!(rows, vec![object(json!({"id": 1, "name": "a"}))]);
}

#[tokio::test]
async fn test_scenario_b_update_then_select() {
    let (_dir, facade) = setup().await;
    assert!(
        facade
            .insert(CONN, "t", &object(json!({"id": 1, "name": "a"})))
            .await
    );

    let conditions: Conditions = object(json!({"id": 1}));
    let affected = facade
        .update(CONN, "t", &object(json!({"name": "b"})), Some(&conditions))
        .await;
    assert_eq!(affected, 1);

    let rows = facade
        .select(CONN, "t", Some(&conditions), None)
        .await
        .unwrap();
    assert_eq!(rows, vec![object(json!({"id": 1, "name": "b"}))]);
}

#[tokio::test]
async fn test_scenario_c_delete_missing_row_is_zero() {
    let (_dir, facade) = setup().await;
    let conditions = object(json!({"id": 99}));
    assert_eq!(facade.delete(CONN, "t", Some(&conditions)).await, 0);
}

#[tokio::test]
async fn test_scenario_d_batch_update_arity_mismatch() {
    let (_dir, facade) = setup().await;
    assert!(
        facade
            .insert(CONN, "t", &object(json!({"id": 1, "name": "a"})))
            .await
    );

    let result = facade
        .batch_update(
            CONN,
            "t",
            &[object(json!({"name": "x"}))],
            &[object(json!({"id": 1})), object(json!({"id": 2}))],
        )
        .await;
    assert!(matches!(
        result,
        Err(DbError::ArityMismatch {
            data_len: 1,
            conditions_len: 2
        })
    ));

    let rows = facade.select(CONN, "t", None, None).await.unwrap();
    assert_eq!(rows[0]["name"], "a");
}

#[tokio::test]
async fn test_update_and_delete_without_conditions_touch_every_row() {
    let (_dir, facade) = setup().await;
    for id in 1..=3 {
        assert!(
            facade
                .insert(CONN, "t", &object(json!({"id": id, "name": "n"})))
                .await
        );
    }

    assert_eq!(
        facade
            .update(CONN, "t", &object(json!({"name": "all"})), None)
            .await,
        3
    );
    assert_eq!(facade.delete(CONN, "t", None).await, 3);
    assert!(facade.select(CONN, "t", None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_select_with_limit_and_null_condition() {
    let (_dir, facade) = setup().await;
    for (id, name) in [(1, json!("a")), (2, JsonValue::Null), (3, json!("c"))] {
        assert!(
            facade
                .insert(CONN, "t", &object(json!({"id": id, "name": name})))
                .await
        );
    }

    let limited = facade.select(CONN, "t", None, Some(2)).await.unwrap();
    assert_eq!(limited.len(), 2);

    // `= NULL` never matches in SQL
    let nulls = facade
        .select(CONN, "t", Some(&object(json!({"name": null}))), None)
        .await
        .unwrap();
    assert!(nulls.is_empty());
}

#[tokio::test]
async fn test_nulls_written_into_integer_column() {
    let (_dir, facade) = setup().await;
    let columns = vec![
        ColumnDefinition::new("id", "INTEGER").primary_key(),
        ColumnDefinition::new("points", "INTEGER"),
    ];
    assert!(facade.create_table(CONN, "scores", &columns, None).await);

    assert!(
        facade
            .insert(CONN, "scores", &object(json!({"id": 1, "points": null})))
            .await
    );
    assert!(
        facade
            .insert(CONN, "scores", &object(json!({"id": 2, "points": 5})))
            .await
    );
    let conditions = object(json!({"id": 2}));
    assert_eq!(
        facade
            .update(CONN, "scores", &object(json!({"points": null})), Some(&conditions))
            .await,
        1
    );

    let rows = facade.select(CONN, "scores", None, None).await.unwrap();
    assert_eq!(
        rows,
        vec![
            object(json!({"id": 1, "points": null})),
            object(json!({"id": 2, "points": null})),
        ]
    );
}

#[tokio::test]
async fn test_failures_report_sentinels() {
    let (_dir, facade) = setup().await;
    let row = object(json!({"id": 1, "name": "a"}));
    assert!(facade.insert(CONN, "t", &row).await);

    // Duplicate primary key
    assert!(!facade.insert(CONN, "t", &row).await);
    // Unknown column
    assert_eq!(
        facade
            .update(CONN, "t", &object(json!({"missing": 1})), None)
            .await,
        -1
    );
    assert!(facade.select(CONN, "nope", None, None).await.is_none());
    assert!(facade.select("other", "t", None, None).await.is_none());
}

#[tokio::test]
async fn test_remove_connection() {
    let (_dir, facade) = setup().await;
    assert!(facade.remove_connection(CONN).await);
    assert!(!facade.remove_connection(CONN).await);
    assert!(facade.list_connections().await.is_empty());
    assert!(facade.list_tables(CONN, None).await.is_none());
}
