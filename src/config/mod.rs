//! Configuration management
//!
//! Handles loading connection profiles and user settings.

pub mod connections;
pub mod settings;

pub use connections::{
    ConnectionProfile, EngineConfig, EngineKind, PostgresConfig, ProfileStore, SqliteConfig,
    SslMode,
};
pub use settings::{Settings, load_settings};

use crate::error::{ConfigError, ConfigResult};
use std::path::PathBuf;

/// Saved profiles, inside [`config_dir`]
pub const CONNECTIONS_FILE: &str = "connections.toml";

/// Default configuration directory (~/.worksheet)
pub fn config_dir() -> ConfigResult<PathBuf> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".worksheet"))
}
