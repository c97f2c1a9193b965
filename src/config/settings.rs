//! User settings
//!
//! Manages application settings stored in ~/.worksheet/config.toml

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Per-statement timeout in seconds; 0 disables it
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,

    /// Upper bound on open worksheet tabs
    #[serde(default = "default_max_tabs")]
    pub max_tabs: usize,

    /// Row count used by first/last preview queries
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,

    /// Default tracing filter when neither env nor CLI sets one
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_query_timeout() -> u64 {
    60
}

fn default_max_tabs() -> usize {
    10
}

fn default_preview_rows() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            query_timeout_secs: default_query_timeout(),
            max_tabs: default_max_tabs(),
            preview_rows: default_preview_rows(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Query timeout, or `None` when disabled
    pub fn query_timeout(&self) -> Option<Duration> {
        (self.query_timeout_secs > 0).then(|| Duration::from_secs(self.query_timeout_secs))
    }

    fn validate(self) -> ConfigResult<Self> {
        if self.max_tabs == 0 {
            return Err(ConfigError::Invalid("max_tabs must be at least 1".into()));
        }
        if self.preview_rows == 0 {
            return Err(ConfigError::Invalid("preview_rows must be at least 1".into()));
        }
        Ok(self)
    }
}

/// Load settings from `config.toml` in `dir`, falling back to defaults
pub fn load_settings(dir: &Path) -> ConfigResult<Settings> {
    let path = dir.join("config.toml");
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let settings: Settings = toml::from_str(&content)?;
    settings.validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings(dir.path()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.query_timeout(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "query_timeout_secs = 0\n").unwrap();
        let settings = load_settings(dir.path()).unwrap();
        assert_eq!(settings.query_timeout(), None);
        assert_eq!(settings.max_tabs, 10);
        assert_eq!(settings.preview_rows, 100);
    }

    #[test]
    fn test_rejects_zero_tabs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "max_tabs = 0\n").unwrap();
        assert!(matches!(
            load_settings(dir.path()),
            Err(ConfigError::Invalid(_))
        ));
    }
}
