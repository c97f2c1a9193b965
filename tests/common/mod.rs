//! Common test utilities and helpers
//!
//! Shared test infrastructure for the integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use worksheet::app::{App, AppEvent};
use worksheet::config::{ConnectionProfile, EngineConfig, ProfileStore, Settings};
use worksheet::db::ConnectionManager;
use worksheet::dispatch::Dispatcher;

/// How long a flow waits for a background task before failing
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(10);

/// SQLite profile for `<dir>/<name>.db`, created on first open
pub fn sqlite_profile(dir: &Path, name: &str) -> ConnectionProfile {
    let mut profile = ConnectionProfile::sqlite(name, dir.join(format!("{}.db", name)));
    if let EngineConfig::Sqlite(cfg) = &mut profile.engine {
        cfg.create_if_missing = true;
    }
    profile
}

/// PostgreSQL profile from the TEST_DB_* environment
pub fn postgres_profile() -> ConnectionProfile {
    let mut profile = ConnectionProfile::postgres(
        "integration-test",
        std::env::var("TEST_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
        std::env::var("TEST_DB_NAME").unwrap_or_else(|_| "test_db".to_string()),
        std::env::var("TEST_DB_USER").unwrap_or_else(|_| "test_user".to_string()),
    );
    if let EngineConfig::Postgres(cfg) = &mut profile.engine {
        cfg.port = std::env::var("TEST_DB_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5433);
        cfg.password = Some(
            std::env::var("TEST_DB_PASSWORD").unwrap_or_else(|_| "test_password".to_string()),
        );
        cfg.ssl_mode = worksheet::config::SslMode::Disable;
    }
    profile
}

/// Manager over a store persisted in `dir`
pub fn manager(dir: &Path, profiles: Vec<ConnectionProfile>) -> Arc<ConnectionManager> {
    let mut store = ProfileStore::load(dir.join("connections.toml")).unwrap();
    for profile in profiles {
        store.add(profile).unwrap();
    }
    Arc::new(ConnectionManager::new(store, Some(Duration::from_secs(30))))
}

/// App, dispatcher and event channel wired the way `main` wires them
pub struct Harness {
    pub app: App,
    pub dispatcher: Dispatcher,
    pub events: mpsc::UnboundedReceiver<AppEvent>,
    pub manager: Arc<ConnectionManager>,
}

impl Harness {
    pub async fn new(manager: Arc<ConnectionManager>, initial: Option<&str>) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let app = App::new(
            &Settings::default(),
            manager.list_profiles().await,
            initial.map(str::to_string),
        );
        Self {
            app,
            dispatcher: Dispatcher::new(Arc::clone(&manager), tx),
            events,
            manager,
        }
    }

    /// Feed background events to the app (dispatching what it returns)
    /// until one matches `done`. That event is applied too.
    pub async fn run_until(&mut self, done: impl Fn(&AppEvent) -> bool) {
        loop {
            let event = tokio::time::timeout(EVENT_TIMEOUT, self.events.recv())
                .await
                .expect("timed out waiting for a background event")
                .expect("event channel closed");
            let matched = done(&event);
            let action = self.app.handle_event(event).unwrap();
            self.dispatcher.dispatch(action);
            if matched {
                return;
            }
        }
    }

    /// Type into the focused panel
    pub fn type_text(&mut self, text: &str) {
        use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
        for c in text.chars() {
            let key = KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE);
            let action = self.app.handle_event(AppEvent::Key(key)).unwrap();
            self.dispatcher.dispatch(action);
        }
    }

    /// Press a key and dispatch the resulting action
    pub fn press(&mut self, code: crossterm::event::KeyCode, modifiers: crossterm::event::KeyModifiers) {
        let key = crossterm::event::KeyEvent::new(code, modifiers);
        let action = self.app.handle_event(AppEvent::Key(key)).unwrap();
        self.dispatcher.dispatch(action);
    }

    /// Run a command-bar line
    pub fn command(&mut self, line: &str) {
        let action = self.app.execute_command(worksheet::commands::parse_command(line).unwrap());
        self.dispatcher.dispatch(action);
    }
}

pub fn is_query_finished(event: &AppEvent) -> bool {
    matches!(event, AppEvent::QueryFinished { .. })
}

pub fn is_schema_loaded(event: &AppEvent) -> bool {
    matches!(event, AppEvent::SchemaLoaded { .. })
}
