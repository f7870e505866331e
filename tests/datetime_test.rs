//! Temporal value normalization tests.
//!
//! Every temporal value read back through select must use the canonical
//! `YYYY-MM-DD HH:MM:SS` form, whatever form it was written in.

use multidb_mcp_server::DatabaseFacade;
use multidb_mcp_server::db::{ConnectionRegistry, QueryExecutor};
use multidb_mcp_server::models::{ColumnDefinition, ConnectionDescriptor, Row};
use serde_json::{Value as JsonValue, json};
use tempfile::TempDir;

const CONN: &str = "dates";

fn object(value: JsonValue) -> Row {
    value.as_object().cloned().unwrap()
}

async fn setup() -> (TempDir, DatabaseFacade) {
    let dir = tempfile::tempdir().unwrap();
    let facade = DatabaseFacade::new(ConnectionRegistry::new(), QueryExecutor::new());
    let descriptor = ConnectionDescriptor::from_value(
        0,
        &json!({
            "name": CONN,
            "type": "sqlite",
            "database": dir.path().join("dates.db"),
            "enabled": true
        }),
    )
    .unwrap();
    assert!(facade.add_connection(&descriptor).await);

    let columns = vec![
        ColumnDefinition::new("id", "INTEGER").primary_key(),
        ColumnDefinition::new("created_at", "DATETIME"),
        ColumnDefinition::new("birthday", "DATE"),
        ColumnDefinition::new("updated", "TIMESTAMP"),
        ColumnDefinition::new("note", "TEXT"),
    ];
    assert!(facade.create_table(CONN, "events", &columns, None).await);
    (dir, facade)
}

async fn read_back(facade: &DatabaseFacade, id: i64) -> Row {
    let conditions = object(json!({"id": id}));
    let mut rows = facade
        .select(CONN, "events", Some(&conditions), None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    rows.remove(0)
}

#[tokio::test]
async fn test_date_only_reads_back_as_midnight() {
    let (_dir, facade) = setup().await;
    assert!(
        facade
            .insert(
                CONN,
                "events",
                &object(json!({"id": 1, "created_at": "2024-01-15", "birthday": "1990-06-01"})),
            )
            .await
    );

    let row = read_back(&facade, 1).await;
    assert_eq!(row["created_at"], "2024-01-15 00:00:00");
    assert_eq!(row["birthday"], "1990-06-01 00:00:00");
}

#[tokio::test]
async fn test_full_datetime_round_trips_unchanged() {
    let (_dir, facade) = setup().await;
    assert!(
        facade
            .insert(
                CONN,
                "events",
                &object(json!({"id": 2, "created_at": "2024-03-09 17:45:03"})),
            )
            .await
    );

    let row = read_back(&facade, 2).await;
    assert_eq!(row["created_at"], "2024-03-09 17:45:03");
    assert_eq!(row["birthday"], JsonValue::Null);
}

#[tokio::test]
async fn test_iso_forms_are_normalized() {
    let (_dir, facade) = setup().await;
    assert!(
        facade
            .insert(
                CONN,
                "events",
                &object(json!({
                    "id": 3,
                    "created_at": "2024-03-09T17:45:03",
                    "updated": "2024-03-09T17:45:03.250Z"
                })),
            )
            .await
    );

    let row = read_back(&facade, 3).await;
    assert_eq!(row["created_at"], "2024-03-09 17:45:03");
    assert_eq!(row["updated"], "2024-03-09 17:45:03");
}

#[tokio::test]
async fn test_text_columns_are_left_alone() {
    let (_dir, facade) = setup().await;
    assert!(
        facade
            .insert(
                CONN,
                "events",
                &object(json!({"id": 4, "note": "2024-01-15"})),
            )
            .await
    );

    let row = read_back(&facade, 4).await;
    assert_eq!(row["note"], "2024-01-15");
}

#[tokio::test]
async fn test_datetime_conditions_and_updates() {
    let (_dir, facade) = setup().await;
    assert!(
        facade
            .insert(
                CONN,
                "events",
                &object(json!({"id": 5, "created_at": "2024-01-15 08:00:00"})),
            )
            .await
    );

    let affected = facade
        .update(
            CONN,
            "events",
            &object(json!({"created_at": "2025-02-01"})),
            Some(&object(json!({"id": 5}))),
        )
        .await;
    assert_eq!(affected, 1);

    let row = read_back(&facade, 5).await;
    assert_eq!(row["created_at"], "2025-02-01 00:00:00");
}
