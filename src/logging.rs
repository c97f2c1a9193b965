//! Tracing setup
//!
//! The terminal belongs to the UI, so log lines go to a file in the config
//! directory. The filter comes from `WORKSHEET_LOG` when set, otherwise from
//! the level the caller resolved (CLI flag or settings).

use crate::error::Result;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a full `EnvFilter` directive
pub const LOG_ENV: &str = "WORKSHEET_LOG";

pub const LOG_FILE: &str = "worksheet.log";

/// Build the filter: env first, then `level`, then plain `info`
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber, appending to `<dir>/worksheet.log`.
/// Returns the log file path.
pub fn init(dir: &Path, level: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(LOG_FILE);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| crate::error::WorksheetError::Terminal(format!("logging: {}", e)))?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "worksheet starting");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_falls_back() {
        // Only meaningful when the env override is absent
        if std::env::var(LOG_ENV).is_ok() {
            return;
        }
        let filter = env_filter("worksheet=loud");
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    fn test_level_used_without_env() {
        if std::env::var(LOG_ENV).is_ok() {
            return;
        }
        assert_eq!(env_filter("debug").to_string(), "debug");
    }
}
