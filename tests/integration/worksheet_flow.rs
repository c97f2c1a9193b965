//! Key presses through the app state machine and dispatcher down to SQLite

use crate::common::{Harness, is_query_finished, is_schema_loaded, manager, sqlite_profile};
use crossterm::event::{KeyCode, KeyModifiers};
use worksheet::app::{AppEvent, PanelFocus};
use worksheet::db::CellValue;
use worksheet::error::DbError;

#[tokio::test]
async fn test_execute_from_editor() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path(), vec![sqlite_profile(dir.path(), "notes")]);
    let mut h = Harness::new(manager, Some("notes")).await;

    h.type_text("SELECT 1");
    h.press(KeyCode::F(5), KeyModifiers::NONE);
    assert!(h.app.tabs.active().is_running());
    h.run_until(is_query_finished).await;

    let tab = h.app.tabs.active();
    assert!(!tab.is_running());
    let results = tab.last_results().unwrap();
    assert_eq!(results.cell(0, 0), Some(&CellValue::Integer(1)));
    assert_eq!(h.app.focus, PanelFocus::Results);
    assert!(h.app.connections.is_open("notes"));
    assert_eq!(h.dispatcher.pending_executions(), 0);
}

#[tokio::test]
async fn test_failed_query_keeps_previous_results() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path(), vec![sqlite_profile(dir.path(), "notes")]);
    let mut h = Harness::new(manager, Some("notes")).await;

    h.type_text("SELECT 1");
    h.press(KeyCode::F(5), KeyModifiers::NONE);
    h.run_until(is_query_finished).await;

    h.app.tabs.active_mut().buffer.set_text("SELEC 1");
    h.press(KeyCode::F(5), KeyModifiers::NONE);
    h.run_until(is_query_finished).await;

    let tab = h.app.tabs.active();
    assert!(matches!(tab.last_error(), Some(DbError::QueryFailed(_))));
    assert_eq!(tab.last_results().unwrap().cell(0, 0), Some(&CellValue::Integer(1)));
}

#[tokio::test]
async fn test_connect_populates_schema_and_drop_refreshes() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path(), vec![sqlite_profile(dir.path(), "notes")]);
    {
        let conn = manager.open("notes").await.unwrap();
        conn.execute(1, "CREATE TABLE orders (id INTEGER PRIMARY KEY)")
            .await
            .unwrap();
        manager.close("notes").await;
    }
    let mut h = Harness::new(manager, Some("notes")).await;

    h.command("connect");
    h.run_until(is_schema_loaded).await;
    assert!(h.app.tree.browser().find("orders").is_some());

    // DDL from the editor refreshes the tree on its own
    h.app.tabs.active_mut().buffer.set_text("DROP TABLE orders");
    h.press(KeyCode::F(5), KeyModifiers::NONE);
    h.run_until(is_query_finished).await;
    h.run_until(is_schema_loaded).await;
    assert!(h.app.tree.browser().find("orders").is_none());
}

#[tokio::test]
async fn test_tabs_keep_independent_results() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path(), vec![sqlite_profile(dir.path(), "notes")]);
    let mut h = Harness::new(manager, Some("notes")).await;

    h.type_text("SELECT 1");
    h.press(KeyCode::F(5), KeyModifiers::NONE);
    h.run_until(is_query_finished).await;

    h.press(KeyCode::Char('t'), KeyModifiers::CONTROL);
    h.type_text("SELECT 2");
    h.press(KeyCode::F(5), KeyModifiers::NONE);
    h.run_until(is_query_finished).await;

    h.press(KeyCode::Char('w'), KeyModifiers::CONTROL);
    let tab = h.app.tabs.active();
    assert_eq!(tab.buffer.text(), "SELECT 1");
    assert_eq!(tab.last_results().unwrap().cell(0, 0), Some(&CellValue::Integer(1)));
}

#[tokio::test]
async fn test_disconnect_then_execute_reopens() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path(), vec![sqlite_profile(dir.path(), "notes")]);
    let mut h = Harness::new(manager, Some("notes")).await;

    h.command("connect");
    h.run_until(|e| matches!(e, AppEvent::Connected { .. })).await;
    h.command("disconnect");
    h.run_until(|e| matches!(e, AppEvent::Disconnected { .. })).await;
    assert!(h.app.tabs.active().is_disconnected());
    assert!(!h.manager.is_open("notes").await);

    h.type_text("SELECT 1");
    h.press(KeyCode::F(5), KeyModifiers::NONE);
    h.run_until(is_query_finished).await;
    assert!(!h.app.tabs.active().is_disconnected());
    assert!(h.app.tabs.active().last_error().is_none());
    assert!(h.manager.is_open("notes").await);
}

#[tokio::test]
async fn test_add_profile_from_dialog_persists() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path(), vec![]);
    let mut h = Harness::new(manager, None).await;

    let url = format!("sqlite://{}", dir.path().join("scratch.db").display());
    h.command(&format!("add {}", url));
    assert_eq!(h.app.focus, PanelFocus::Dialog);
    h.press(KeyCode::Enter, KeyModifiers::NONE);
    h.run_until(|e| matches!(e, AppEvent::ProfileSaved { .. })).await;
    h.run_until(|e| matches!(e, AppEvent::ProfilesChanged { .. })).await;

    assert!(!h.app.dialog.is_visible());
    assert!(h.app.connections.get("scratch").is_some());
    let saved = std::fs::read_to_string(dir.path().join("connections.toml")).unwrap();
    assert!(saved.contains("scratch"));
}

#[tokio::test]
async fn test_cancel_long_query() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path(), vec![sqlite_profile(dir.path(), "notes")]);
    let mut h = Harness::new(manager, Some("notes")).await;

    h.app.tabs.active_mut().buffer.set_text(
        "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n) SELECT count(*) FROM n",
    );
    h.press(KeyCode::F(5), KeyModifiers::NONE);
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    h.press(KeyCode::Char('c'), KeyModifiers::CONTROL);

    assert!(!h.app.tabs.active().is_running());
    assert_eq!(h.app.tabs.active().last_error(), Some(&DbError::Cancelled));

    // Interrupted or aborted, the connection is free for the next statement
    h.app.tabs.active_mut().buffer.set_text("SELECT 1");
    h.press(KeyCode::F(5), KeyModifiers::NONE);
    h.run_until(|e| {
        matches!(e, AppEvent::QueryFinished { result: Ok(r), .. } if r.row_count() == 1)
    })
    .await;
    assert_eq!(
        h.app.tabs.active().last_results().unwrap().cell(0, 0),
        Some(&CellValue::Integer(1))
    );
}
