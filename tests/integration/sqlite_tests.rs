//! SQLite through the connection manager, against real files

use crate::common::{manager, sqlite_profile};
use worksheet::browser::SchemaBrowser;
use worksheet::config::{EngineKind, ProfileStore};
use worksheet::db::{CellValue, NodeKind};
use worksheet::error::DbError;
use worksheet::sql::{PreviewKind, preview_query};

#[tokio::test]
async fn test_select_one() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path(), vec![sqlite_profile(dir.path(), "notes")]);
    let conn = manager.open("notes").await.unwrap();

    let results = conn.execute(1, "SELECT 1").await.unwrap();
    assert_eq!(results.column_names(), vec!["1"]);
    assert_eq!(results.rows().len(), 1);
    assert_eq!(results.cell(0, 0), Some(&CellValue::Integer(1)));
}

#[tokio::test]
async fn test_syntax_error_then_recovery() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path(), vec![sqlite_profile(dir.path(), "notes")]);
    let conn = manager.open("notes").await.unwrap();

    match conn.execute(1, "SELEC 1").await {
        Err(DbError::QueryFailed(msg)) => assert!(msg.contains("syntax error"), "{}", msg),
        other => panic!("expected QueryFailed, got {:?}", other),
    }
    // The connection stays usable
    assert_eq!(conn.execute(2, "SELECT 2").await.unwrap().row_count(), 1);
}

#[tokio::test]
async fn test_refresh_tracks_create_and_drop() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path(), vec![sqlite_profile(dir.path(), "notes")]);
    let conn = manager.open("notes").await.unwrap();

    conn.execute(1, "CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)")
        .await
        .unwrap();
    conn.execute(2, "CREATE VIEW recent AS SELECT * FROM notes")
        .await
        .unwrap();

    let mut browser = SchemaBrowser::new();
    let id = browser.begin("notes");
    assert!(browser.apply(id, SchemaBrowser::refresh(&conn).await));
    let names: Vec<_> = browser.nodes().iter().map(|n| (n.kind, n.name.as_str())).collect();
    assert_eq!(names, vec![(NodeKind::Table, "notes"), (NodeKind::View, "recent")]);
    assert_eq!(browser.nodes()[0].primary_key(), Some("id"));

    conn.execute(3, "DROP VIEW recent").await.unwrap();
    let id = browser.begin("notes");
    assert!(browser.apply(id, SchemaBrowser::refresh(&conn).await));
    assert!(browser.find("recent").is_none());
    assert!(browser.find("notes").is_some());
}

#[tokio::test]
async fn test_insert_reports_rows_affected() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path(), vec![sqlite_profile(dir.path(), "notes")]);
    let conn = manager.open("notes").await.unwrap();

    conn.execute(1, "CREATE TABLE t (x INTEGER)").await.unwrap();
    let results = conn
        .execute(2, "INSERT INTO t VALUES (1), (2), (3)")
        .await
        .unwrap();
    assert!(results.is_command());
    assert_eq!(results.rows_affected(), Some(3));
}

#[tokio::test]
async fn test_last_rows_preview_uses_rowid() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path(), vec![sqlite_profile(dir.path(), "notes")]);
    let conn = manager.open("notes").await.unwrap();

    conn.execute(1, "CREATE TABLE log (msg TEXT)").await.unwrap();
    conn.execute(2, "INSERT INTO log VALUES ('a'), ('b'), ('c'), ('d')")
        .await
        .unwrap();

    let mut browser = SchemaBrowser::new();
    let id = browser.begin("notes");
    browser.apply(id, SchemaBrowser::refresh(&conn).await);
    let (schema, node) = browser.find("log").unwrap();
    let sql = preview_query(EngineKind::Sqlite, schema, node, PreviewKind::Last(2));

    let results = conn.execute(3, &sql).await.unwrap();
    assert_eq!(results.row_count(), 2);
    assert_eq!(results.cell(0, 0), Some(&CellValue::Text("c".to_string())));
    assert_eq!(results.cell(1, 0), Some(&CellValue::Text("d".to_string())));
}

#[tokio::test]
async fn test_concurrent_executions_on_one_connection() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path(), vec![sqlite_profile(dir.path(), "notes")]);
    let conn = manager.open("notes").await.unwrap();

    let (a, b) = tokio::join!(conn.execute(1, "SELECT 1"), conn.execute(2, "SELECT 2"));
    assert_eq!(a.unwrap().cell(0, 0), Some(&CellValue::Integer(1)));
    assert_eq!(b.unwrap().cell(0, 0), Some(&CellValue::Integer(2)));
}

#[tokio::test]
async fn test_close_then_lazy_reopen_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path(), vec![sqlite_profile(dir.path(), "notes")]);

    let conn = manager.open("notes").await.unwrap();
    conn.execute(1, "CREATE TABLE kept (x INTEGER)").await.unwrap();
    assert!(manager.close("notes").await);
    assert!(!manager.is_open("notes").await);

    let conn = manager.open("notes").await.unwrap();
    let results = conn.execute(2, "SELECT count(*) FROM kept").await.unwrap();
    assert_eq!(results.cell(0, 0), Some(&CellValue::Integer(0)));
}

#[tokio::test]
async fn test_profiles_persist_and_order_by_usage() {
    let dir = tempfile::tempdir().unwrap();
    {
        let manager = manager(
            dir.path(),
            vec![sqlite_profile(dir.path(), "alpha"), sqlite_profile(dir.path(), "beta")],
        );
        manager.open("beta").await.unwrap();
        manager.close_all().await;
    }

    let store = ProfileStore::load(dir.path().join("connections.toml")).unwrap();
    let names: Vec<_> = store.profiles().iter().map(|p| p.name.clone()).collect();
    assert_eq!(names, vec!["beta".to_string(), "alpha".to_string()]);
    assert_eq!(store.get("beta").unwrap().usage_count, 1);
}
