//! Error types for worksheet
//!
//! This module defines the error hierarchy used throughout the application.
//! We use `thiserror` for library-style errors with clear error chains.
//!
//! The data layer reports three families of failure, one per user action:
//! connecting ([`DbError::ConnectionFailed`]), refreshing the schema tree
//! ([`DbError::SchemaLoadFailed`]) and running a query
//! ([`DbError::QueryFailed`]). None of them is fatal to the process.

use std::io;
use std::time::Duration;

/// Main error type for the worksheet application
#[derive(Debug, thiserror::Error)]
pub enum WorksheetError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tab bookkeeping errors
    #[error("Tab error: {0}")]
    Tab(#[from] TabError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Terminal/UI errors
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Command parsing errors
    #[error("Command error: {0}")]
    Command(#[from] CommandError),
}

/// Database operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DbError {
    /// Failed to establish (or keep) a connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed; carries the driver's message verbatim
    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    /// Schema introspection failed
    #[error("Schema loading failed: {0}")]
    SchemaLoadFailed(String),

    /// The statement was cancelled through the driver
    #[error("Query cancelled")]
    Cancelled,

    /// The statement ran past the configured timeout and was cancelled
    #[error("Query timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    /// No live connection for the named profile
    #[error("Not connected to '{0}'")]
    NotConnected(String),

    /// A result set whose rows do not line up with its columns
    #[error("Malformed result: {0}")]
    MalformedResult(String),
}

/// Configuration loading/parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Home directory not found
    #[error("Could not determine home directory")]
    NoHomeDir,

    /// Config file could not be read or written
    #[error("Failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("Failed to write configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Connection profile not found
    #[error("Connection profile '{0}' not found")]
    ProfileNotFound(String),

    /// A profile with this name already exists
    #[error("Connection profile '{0}' already exists")]
    DuplicateProfile(String),

    /// The profile is still referenced by an open tab
    #[error("Connection profile '{0}' is used by an open tab")]
    ProfileInUse(String),
}

/// Command parsing and execution errors
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Unknown command
    #[error("Unknown command: {0}")]
    Unknown(String),

    /// Missing required argument
    #[error("Missing required argument for /{0}")]
    MissingArgument(&'static str),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Query tab bookkeeping errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TabError {
    /// No tab with this id
    #[error("Tab {0} does not exist")]
    NotFound(usize),

    /// A query is already running in this tab
    #[error("A query is already running in this tab")]
    AlreadyRunning,

    /// Nothing to execute
    #[error("Query is empty")]
    EmptyQuery,

    /// The tab has no connection assigned
    #[error("No connection selected for this tab")]
    NoConnection,

    /// The last remaining tab cannot be closed
    #[error("Must keep at least one tab")]
    LastTab,

    /// Tab limit reached
    #[error("Maximum {0} tabs open")]
    LimitReached(usize),
}

/// Specialized Result type for worksheet operations
pub type Result<T> = std::result::Result<T, WorksheetError>;

/// Specialized Result type for database operations
pub type DbResult<T> = std::result::Result<T, DbError>;

/// Specialized Result type for config operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized Result type for command operations
pub type CommandResult<T> = std::result::Result<T, CommandError>;

/// Specialized Result type for tab operations
pub type TabResult<T> = std::result::Result<T, TabError>;
