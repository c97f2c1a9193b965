//! PostgreSQL through the connection manager
//!
//! These tests need a reachable server (see `tests/integration.rs`). Each
//! test works inside its own schema and drops it afterwards; without a
//! server they print a note and return.

use crate::common::postgres_profile;
use std::sync::Arc;
use std::time::Duration;
use worksheet::browser::SchemaBrowser;
use worksheet::config::{EngineKind, ProfileStore};
use worksheet::db::{ActiveConnection, CellValue, ConnectionManager, NodeKind};
use worksheet::error::DbError;
use worksheet::sql::{PreviewKind, preview_query};

/// Connect, or explain why the test is skipped
async fn connect(timeout: Option<Duration>) -> Option<(Arc<ConnectionManager>, Arc<ActiveConnection>)> {
    let profile = postgres_profile();
    let mut store = ProfileStore::in_memory();
    store.add(profile.clone()).unwrap();
    let manager = Arc::new(ConnectionManager::new(store, timeout));
    match manager.open(&profile.name).await {
        Ok(conn) => Some((manager, conn)),
        Err(e) => {
            eprintln!("Skipping test: Database not available at {} - {}", profile.location(), e);
            None
        }
    }
}

/// Fresh schema named after the test
async fn scratch_schema(conn: &ActiveConnection, name: &str) -> String {
    let schema = format!("worksheet_it_{}_{}", name, std::process::id());
    conn.execute(0, &format!("DROP SCHEMA IF EXISTS {} CASCADE", schema))
        .await
        .unwrap();
    conn.execute(0, &format!("CREATE SCHEMA {}", schema))
        .await
        .unwrap();
    schema
}

async fn drop_schema(conn: &ActiveConnection, schema: &str) {
    let _ = conn
        .execute(0, &format!("DROP SCHEMA IF EXISTS {} CASCADE", schema))
        .await;
}

#[tokio::test]
async fn test_execute_simple_query() {
    let Some((_manager, conn)) = connect(None).await else {
        return;
    };

    let results = conn
        .execute(1, "SELECT 1 AS num, 'hello' AS msg, NULL::text AS nothing")
        .await
        .unwrap();
    assert_eq!(results.column_names(), vec!["num", "msg", "nothing"]);
    assert_eq!(results.row_count(), 1);
    assert_eq!(results.cell(0, 0), Some(&CellValue::Integer(1)));
    assert_eq!(results.cell(0, 1), Some(&CellValue::Text("hello".to_string())));
    assert!(results.cell(0, 2).unwrap().is_null());
}

#[tokio::test]
async fn test_invalid_query_keeps_driver_message() {
    let Some((_manager, conn)) = connect(None).await else {
        return;
    };

    match conn.execute(1, "SELECT * FROM nonexistent_table").await {
        Err(DbError::QueryFailed(msg)) => assert!(msg.contains("nonexistent_table"), "{}", msg),
        other => panic!("expected QueryFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_schema_tree_lists_tables_views_and_keys() {
    let Some((_manager, conn)) = connect(None).await else {
        return;
    };
    let schema = scratch_schema(&conn, "tree").await;
    conn.execute(
        1,
        &format!(
            "CREATE TABLE {s}.users (id serial PRIMARY KEY, name text NOT NULL);
             CREATE VIEW {s}.user_names AS SELECT name FROM {s}.users",
            s = schema
        ),
    )
    .await
    .unwrap();

    let mut browser = SchemaBrowser::new();
    let id = browser.begin("integration-test");
    assert!(browser.apply(id, SchemaBrowser::refresh(&conn).await));

    let node = browser
        .nodes()
        .iter()
        .find(|n| n.name == schema)
        .expect("scratch schema should be listed");
    assert_eq!(node.kind, NodeKind::Schema);
    let users = node.children.iter().find(|c| c.name == "users").unwrap();
    assert_eq!(users.kind, NodeKind::Table);
    assert_eq!(users.primary_key(), Some("id"));
    let view = node.children.iter().find(|c| c.name == "user_names").unwrap();
    assert_eq!(view.kind, NodeKind::View);
    assert!(
        browser
            .nodes()
            .iter()
            .all(|n| !n.name.starts_with("pg_") && n.name != "information_schema")
    );

    drop_schema(&conn, &schema).await;
}

#[tokio::test]
async fn test_last_rows_preview() {
    let Some((_manager, conn)) = connect(None).await else {
        return;
    };
    let schema = scratch_schema(&conn, "preview").await;
    conn.execute(
        1,
        &format!(
            "CREATE TABLE {s}.events (id int PRIMARY KEY, label text);
             INSERT INTO {s}.events SELECT g, 'e' || g FROM generate_series(1, 10) g",
            s = schema
        ),
    )
    .await
    .unwrap();

    let mut browser = SchemaBrowser::new();
    let id = browser.begin("integration-test");
    browser.apply(id, SchemaBrowser::refresh(&conn).await);
    let qualified = format!("{}.events", schema);
    let (owner, node) = browser.find(&qualified).unwrap();
    let sql = preview_query(EngineKind::Postgres, owner, node, PreviewKind::Last(3));

    let results = conn.execute(2, &sql).await.unwrap();
    assert_eq!(results.row_count(), 3);
    assert_eq!(results.cell(0, 0), Some(&CellValue::Integer(8)));
    assert_eq!(results.cell(2, 0), Some(&CellValue::Integer(10)));

    drop_schema(&conn, &schema).await;
}

#[tokio::test]
async fn test_update_reports_rows_affected() {
    let Some((_manager, conn)) = connect(None).await else {
        return;
    };
    let schema = scratch_schema(&conn, "affected").await;
    conn.execute(
        1,
        &format!(
            "CREATE TABLE {s}.t (x int); INSERT INTO {s}.t VALUES (1), (2), (3)",
            s = schema
        ),
    )
    .await
    .unwrap();

    let results = conn
        .execute(2, &format!("UPDATE {}.t SET x = x + 1 WHERE x > 1", schema))
        .await
        .unwrap();
    assert!(results.is_command());
    assert_eq!(results.rows_affected(), Some(2));

    drop_schema(&conn, &schema).await;
}

#[tokio::test]
async fn test_script_keeps_last_statement_result() {
    let Some((_manager, conn)) = connect(None).await else {
        return;
    };
    let schema = scratch_schema(&conn, "script").await;
    conn.execute(1, &format!("CREATE TABLE {}.t (x int)", schema))
        .await
        .unwrap();

    let results = conn
        .execute(2, &format!("SELECT 1; INSERT INTO {}.t VALUES (42)", schema))
        .await
        .unwrap();
    assert!(results.is_command());
    assert_eq!(results.rows_affected(), Some(1));

    let results = conn
        .execute(3, &format!("INSERT INTO {s}.t VALUES (7); SELECT x FROM {s}.t ORDER BY x", s = schema))
        .await
        .unwrap();
    assert_eq!(results.column_names(), vec!["x"]);
    assert_eq!(results.row_count(), 2);

    drop_schema(&conn, &schema).await;
}

#[tokio::test]
async fn test_cancel_running_statement() {
    let Some((_manager, conn)) = connect(None).await else {
        return;
    };

    let worker = Arc::clone(&conn);
    let running = tokio::spawn(async move { worker.execute(7, "SELECT pg_sleep(30)").await });
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(conn.cancel(7).await);
    let result = running.await.unwrap();
    assert!(matches!(result, Err(DbError::Cancelled)), "{:?}", result);
    assert_eq!(conn.execute(8, "SELECT 1").await.unwrap().row_count(), 1);
}

#[tokio::test]
async fn test_timeout_cancels_statement() {
    let Some((_manager, conn)) = connect(Some(Duration::from_secs(1))).await else {
        return;
    };

    let result = conn.execute(1, "SELECT pg_sleep(10)").await;
    assert_eq!(result.unwrap_err(), DbError::Timeout(Duration::from_secs(1)));
}

#[tokio::test]
async fn test_connection_failure() {
    let mut profile = postgres_profile();
    if let worksheet::config::EngineConfig::Postgres(cfg) = &mut profile.engine {
        cfg.host = "invalid-host-that-does-not-exist".to_string();
        cfg.port = 9999;
    }
    let manager = ConnectionManager::new(ProfileStore::in_memory(), None);
    let result = manager.test_connection(&profile).await;
    assert!(matches!(result, Err(DbError::ConnectionFailed(_))));
}
