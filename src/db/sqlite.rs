//! SQLite database provider
//!
//! Concrete implementation using rusqlite. rusqlite is synchronous, so every
//! call hops onto the blocking pool; cancellation goes through the
//! connection's interrupt handle, which is safe to use from any thread.

use crate::config::SqliteConfig;
use crate::db::Database;
use crate::db::schema::SchemaNode;
use crate::db::types::{CellValue, ColumnDef, DataType, QueryResults, Row};
use crate::error::{DbError, DbResult};
use rusqlite::types::ValueRef;
use rusqlite::{Batch, ErrorCode, InterruptHandle, OpenFlags};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite database provider
pub struct SqliteProvider {
    /// `None` once closed
    conn: Arc<Mutex<Option<rusqlite::Connection>>>,
    interrupt: InterruptHandle,
    label: String,
}

impl SqliteProvider {
    /// Open the database file (or `:memory:`).
    ///
    /// A missing file is an error unless `create_if_missing` is set.
    pub async fn open(config: &SqliteConfig) -> DbResult<Self> {
        let path = config.path.clone();
        let create = config.create_if_missing;
        let label = path.display().to_string();

        let conn = tokio::task::spawn_blocking(move || open_blocking(&path, create))
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))??;

        let interrupt = conn.get_interrupt_handle();
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            interrupt,
            label,
        })
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> DbResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> DbResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let label = self.label.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| DbError::QueryFailed("connection lock poisoned".into()))?;
            let conn = guard.as_ref().ok_or(DbError::NotConnected(label))?;
            f(conn)
        })
        .await
        .map_err(|e| DbError::QueryFailed(e.to_string()))?
    }
}

impl Database for SqliteProvider {
    async fn execute_query(&self, sql: &str) -> DbResult<QueryResults> {
        let sql = sql.to_string();
        self.with_conn(move |conn| run_query(conn, &sql)).await
    }

    async fn get_schema(&self) -> DbResult<Vec<SchemaNode>> {
        self.with_conn(|conn| {
            load_schema(conn).map_err(|e| DbError::SchemaLoadFailed(e.to_string()))
        })
        .await
    }

    async fn cancel_query(&self) -> DbResult<()> {
        self.interrupt.interrupt();
        Ok(())
    }

    async fn close(&self) -> DbResult<()> {
        self.interrupt.interrupt();
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| DbError::QueryFailed("connection lock poisoned".into()))?;
            if let Some(conn) = guard.take() {
                conn.close()
                    .map_err(|(_, e)| DbError::QueryFailed(e.to_string()))?;
            }
            Ok(())
        })
        .await
        .map_err(|e| DbError::QueryFailed(e.to_string()))?
    }
}

fn open_blocking(path: &Path, create: bool) -> DbResult<rusqlite::Connection> {
    let fail = |e: rusqlite::Error| DbError::ConnectionFailed(format!("{}: {}", path.display(), e));

    let conn = if path == Path::new(":memory:") {
        rusqlite::Connection::open_in_memory().map_err(fail)?
    } else {
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if create {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        rusqlite::Connection::open_with_flags(path, flags).map_err(fail)?
    };
    conn.busy_timeout(BUSY_TIMEOUT).map_err(fail)?;
    // opening is lazy; touch the header so a non-database file fails here
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |_| Ok(()))
        .map_err(fail)?;
    Ok(conn)
}

fn query_error(e: rusqlite::Error) -> DbError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::OperationInterrupted => {
            DbError::Cancelled
        }
        _ => DbError::QueryFailed(e.to_string()),
    }
}

/// Run every statement in `sql` in order and keep the last one's result
fn run_query(conn: &rusqlite::Connection, sql: &str) -> DbResult<QueryResults> {
    let start = Instant::now();
    let mut last = None;
    let mut batch = Batch::new(conn, sql);
    while let Some(mut stmt) = batch.next().map_err(query_error)? {
        last = Some(run_statement(conn, &mut stmt)?);
    }
    Ok(match last {
        Some(Outcome::Rows(columns, rows)) => QueryResults::new(columns, rows, start.elapsed())?,
        Some(Outcome::Changed(n)) => QueryResults::command(n, start.elapsed()),
        None => QueryResults::command(0, start.elapsed()),
    })
}

enum Outcome {
    Rows(Vec<ColumnDef>, Vec<Row>),
    Changed(u64),
}

fn run_statement(conn: &rusqlite::Connection, stmt: &mut rusqlite::Statement<'_>) -> DbResult<Outcome> {
    if stmt.column_count() == 0 {
        // sqlite3_changes() keeps the last DML count across DDL, so only
        // trust it when this statement moved total_changes()
        let before = total_changes(conn)?;
        stmt.execute([]).map_err(query_error)?;
        let changed = if total_changes(conn)? > before {
            conn.changes() as u64
        } else {
            0
        };
        return Ok(Outcome::Changed(changed));
    }

    let columns: Vec<ColumnDef> = stmt
        .columns()
        .iter()
        .map(|col| ColumnDef {
            name: col.name().to_string(),
            data_type: DataType::from_sqlite_decl(col.decl_type().unwrap_or_default()),
        })
        .collect();

    let width = columns.len();
    let mut rows = Vec::new();
    let mut cursor = stmt.query([]).map_err(query_error)?;
    while let Some(row) = cursor.next().map_err(query_error)? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(cell_from_ref(row.get_ref(i).map_err(query_error)?));
        }
        rows.push(Row { values });
    }
    Ok(Outcome::Rows(columns, rows))
}

fn total_changes(conn: &rusqlite::Connection) -> DbResult<i64> {
    conn.query_row("SELECT total_changes()", [], |row| row.get(0))
        .map_err(query_error)
}

fn cell_from_ref(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(i) => CellValue::Integer(i),
        ValueRef::Real(f) => CellValue::Float(f),
        ValueRef::Text(bytes) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => CellValue::Binary(bytes.to_vec()),
    }
}

/// Tables and views from `sqlite_master`, then columns per relation
fn load_schema(conn: &rusqlite::Connection) -> rusqlite::Result<Vec<SchemaNode>> {
    let mut stmt = conn.prepare(
        "SELECT name, type FROM sqlite_master \
         WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' \
         ORDER BY type, name",
    )?;
    let relations: Vec<(String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<_>>()?;

    let mut columns_stmt = conn.prepare("SELECT name, type, pk FROM pragma_table_info(?1)")?;
    let mut nodes = Vec::with_capacity(relations.len());
    for (name, kind) in relations {
        let columns = columns_stmt
            .query_map([&name], |row| {
                let col: String = row.get(0)?;
                let decl: String = row.get(1)?;
                let pk: i64 = row.get(2)?;
                Ok(SchemaNode::column(col, DataType::from_sqlite_decl(&decl), pk > 0))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        nodes.push(match kind.as_str() {
            "view" => SchemaNode::view(name, columns),
            _ => SchemaNode::table(name, columns),
        });
    }
    Ok(nodes)
}
