//! worksheet - a keyboard-driven SQL client for the terminal
//!
//! worksheet connects to SQLite files and PostgreSQL servers, shows their
//! schema as a tree and runs SQL from independent worksheet tabs, each bound
//! to a saved connection profile.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`]: Connection profiles and application settings
//! - [`db`]: Engine drivers and the [`db::ConnectionManager`]
//! - [`browser`]: Schema tree state and refresh
//! - [`tabs`] / [`editor`]: Worksheet tabs and their text buffers
//! - [`sql`]: Preview query builder
//! - [`ui`]: Terminal user interface components
//! - [`commands`]: Command parsing for the command bar
//! - [`app`]: Application state and event handling
//! - [`dispatch`]: Runs the app's actions on background tasks
//! - [`error`]: Error types and result aliases
//!
//! # Example
//!
//! ```no_run
//! use worksheet::config::{ConnectionProfile, ProfileStore};
//! use worksheet::db::ConnectionManager;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = ProfileStore::in_memory();
//! store.add(ConnectionProfile::from_url("sqlite://notes.db")?)?;
//!
//! let manager = ConnectionManager::new(store, None);
//! let conn = manager.open("notes").await?;
//! let results = conn.execute(1, "SELECT 1").await?;
//! println!("Got {} rows", results.row_count());
//!
//! for node in conn.introspect().await? {
//!     println!("{}", node.name);
//! }
//! manager.close_all().await;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod browser;
pub mod commands;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod editor;
pub mod error;
pub mod keymap;
pub mod logging;
pub mod sql;
pub mod tabs;
pub mod ui;

pub use error::{CommandError, ConfigError, DbError, Result, TabError, WorksheetError};
