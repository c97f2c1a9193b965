//! Database engine abstraction
//!
//! Every backend implements [`Database`]. The concrete backend is chosen
//! once, when a profile is opened, and carried in the [`Connection`] enum so
//! callers never need to know which client library sits underneath.

use crate::config::{ConnectionProfile, EngineConfig};
use crate::db::postgres::PostgresProvider;
use crate::db::schema::SchemaNode;
use crate::db::sqlite::SqliteProvider;
use crate::db::types::QueryResults;
use crate::error::DbResult;
use tokio::sync::mpsc;

/// Operations every database backend provides
#[allow(async_fn_in_trait)]
pub trait Database {
    /// Execute SQL text verbatim and collect the full result
    ///
    /// # Errors
    /// Returns `DbError::QueryFailed` with the driver message, or
    /// `DbError::Cancelled` if the statement was interrupted
    async fn execute_query(&self, sql: &str) -> DbResult<QueryResults>;

    /// Read catalog metadata into a fresh tree
    ///
    /// # Errors
    /// Returns `DbError::SchemaLoadFailed` if introspection fails
    async fn get_schema(&self) -> DbResult<Vec<SchemaNode>>;

    /// Ask the server to abort whatever statement is running
    async fn cancel_query(&self) -> DbResult<()>;

    /// Release the underlying handle; later calls fail with `NotConnected`
    async fn close(&self) -> DbResult<()>;
}

/// A live backend, selected by the profile's engine
pub enum Connection {
    Sqlite(SqliteProvider),
    Postgres(PostgresProvider),
}

/// Fires once if the server side of a connection goes away
pub type LostReceiver = mpsc::UnboundedReceiver<String>;

impl Connection {
    /// Connect using the engine configured in `profile`
    pub async fn open(profile: &ConnectionProfile) -> DbResult<(Self, Option<LostReceiver>)> {
        match &profile.engine {
            EngineConfig::Sqlite(cfg) => {
                let provider = SqliteProvider::open(cfg).await?;
                Ok((Connection::Sqlite(provider), None))
            }
            EngineConfig::Postgres(cfg) => {
                let (provider, lost) = PostgresProvider::connect(cfg).await?;
                Ok((Connection::Postgres(provider), Some(lost)))
            }
        }
    }
}

impl Database for Connection {
    async fn execute_query(&self, sql: &str) -> DbResult<QueryResults> {
        match self {
            Connection::Sqlite(db) => db.execute_query(sql).await,
            Connection::Postgres(db) => db.execute_query(sql).await,
        }
    }

    async fn get_schema(&self) -> DbResult<Vec<SchemaNode>> {
        match self {
            Connection::Sqlite(db) => db.get_schema().await,
            Connection::Postgres(db) => db.get_schema().await,
        }
    }

    async fn cancel_query(&self) -> DbResult<()> {
        match self {
            Connection::Sqlite(db) => db.cancel_query().await,
            Connection::Postgres(db) => db.cancel_query().await,
        }
    }

    async fn close(&self) -> DbResult<()> {
        match self {
            Connection::Sqlite(db) => db.close().await,
            Connection::Postgres(db) => db.close().await,
        }
    }
}
