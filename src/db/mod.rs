//! Database abstraction layer
//!
//! A [`Database`] trait over the two supported engines, the
//! [`ConnectionManager`] that owns live connections, and the value types
//! they exchange with the rest of the application.

pub mod manager;
pub mod postgres;
pub mod provider;
pub mod schema;
pub mod sqlite;
pub mod types;

// Re-export main types
pub use manager::{ActiveConnection, ConnectionManager, ConnectionNotice};
pub use provider::{Connection, Database};
pub use schema::{NodeKind, SchemaNode};
pub use types::{CellValue, ColumnDef, DataType, QueryResults, ResultSet, Row};
