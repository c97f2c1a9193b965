//! PostgreSQL database provider
//!
//! Concrete implementation using tokio-postgres.

use crate::config::{PostgresConfig, SslMode};
use crate::db::Database;
use crate::db::schema::{NodeKind, SchemaNode};
use crate::db::types::{CellValue, ColumnDef, DataType, QueryResults, Row};
use crate::error::{DbError, DbResult};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::{FromSql, Type};
use tokio_postgres::{Client, SimpleQueryMessage};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// PostgreSQL database provider
pub struct PostgresProvider {
    /// The tokio-postgres client
    client: Client,
    /// Token for cancelling in-flight queries
    cancel_token: tokio_postgres::CancelToken,
    /// SSL mode (needed to cancel over the right transport)
    ssl_mode: SslMode,
    closed: AtomicBool,
}

impl PostgresProvider {
    /// Connect to a PostgreSQL server.
    ///
    /// Returns the provider and a receiver that fires if the background
    /// connection is lost (e.g. server restart, idle timeout).
    pub async fn connect(
        config: &PostgresConfig,
    ) -> DbResult<(Self, mpsc::UnboundedReceiver<String>)> {
        let pg_config = build_config(config);
        let (lost_tx, lost_rx) = mpsc::unbounded_channel();

        tracing::debug!(target = %config.connection_string(), "connecting to postgres");
        let client = match config.ssl_mode {
            SslMode::Disable => {
                let (client, connection) = pg_config
                    .connect(tokio_postgres::NoTls)
                    .await
                    .map_err(|e| DbError::ConnectionFailed(describe(&e)))?;
                watch_connection(connection, lost_tx);
                client
            }
            SslMode::Prefer | SslMode::Require => {
                let tls = tokio_postgres_rustls::MakeRustlsConnect::new(make_tls_config());
                let (client, connection) = pg_config
                    .connect(tls)
                    .await
                    .map_err(|e| DbError::ConnectionFailed(describe(&e)))?;
                watch_connection(connection, lost_tx);
                client
            }
        };

        let cancel_token = client.cancel_token();
        Ok((
            Self {
                client,
                cancel_token,
                ssl_mode: config.ssl_mode,
                closed: AtomicBool::new(false),
            },
            lost_rx,
        ))
    }

    fn ensure_open(&self) -> DbResult<()> {
        if self.closed.load(Ordering::Acquire) || self.client.is_closed() {
            return Err(DbError::NotConnected("postgres".into()));
        }
        Ok(())
    }

    /// Run text through the simple query protocol. Used for scripts that
    /// contain several statements, which cannot be prepared.
    async fn execute_simple(&self, sql: &str, start: Instant) -> DbResult<QueryResults> {
        let messages = self.client.simple_query(sql).await.map_err(query_error)?;

        // Only the last statement's outcome survives: a row set, or a command
        let mut columns: Option<Vec<ColumnDef>> = None;
        let mut rows = Vec::new();
        let mut affected = 0;
        let mut in_rows = false;
        for message in messages {
            match message {
                SimpleQueryMessage::RowDescription(desc) => {
                    in_rows = true;
                    columns = Some(
                        desc.iter()
                            .map(|c| ColumnDef {
                                name: c.name().to_string(),
                                data_type: DataType::Text,
                            })
                            .collect(),
                    );
                    rows.clear();
                }
                SimpleQueryMessage::Row(row) => {
                    let values = (0..row.len())
                        .map(|i| {
                            row.get(i)
                                .map_or(CellValue::Null, |s| CellValue::Text(s.to_string()))
                        })
                        .collect();
                    rows.push(Row { values });
                }
                SimpleQueryMessage::CommandComplete(n) => {
                    if !in_rows {
                        columns = None;
                        rows.clear();
                        affected = n;
                    }
                    in_rows = false;
                }
                _ => {}
            }
        }

        match columns {
            Some(columns) => QueryResults::new(columns, rows, start.elapsed()),
            None => Ok(QueryResults::command(affected, start.elapsed())),
        }
    }
}

impl Database for PostgresProvider {
    async fn execute_query(&self, sql: &str) -> DbResult<QueryResults> {
        self.ensure_open()?;
        let start = Instant::now();

        let stmt = match self.client.prepare(sql).await {
            Ok(stmt) => stmt,
            Err(e) if is_multi_statement(&e) => return self.execute_simple(sql, start).await,
            Err(e) => return Err(query_error(e)),
        };

        if stmt.columns().is_empty() {
            let affected = self.client.execute(&stmt, &[]).await.map_err(query_error)?;
            return Ok(QueryResults::command(affected, start.elapsed()));
        }

        let columns: Vec<ColumnDef> = stmt
            .columns()
            .iter()
            .map(|col| ColumnDef {
                name: col.name().to_string(),
                data_type: pg_type_to_datatype(col.type_()),
            })
            .collect();

        let pg_rows = self.client.query(&stmt, &[]).await.map_err(query_error)?;

        let rows = pg_rows
            .iter()
            .map(|pg_row| Row {
                values: columns
                    .iter()
                    .enumerate()
                    .map(|(i, col)| extract_cell_value(pg_row, i, &col.data_type))
                    .collect(),
            })
            .collect();

        QueryResults::new(columns, rows, start.elapsed())
    }

    async fn get_schema(&self) -> DbResult<Vec<SchemaNode>> {
        self.ensure_open()?;
        let map_err = |e: tokio_postgres::Error| DbError::SchemaLoadFailed(describe(&e));

        // Schemas (exclude pg_ internal and information_schema)
        let schema_rows = self
            .client
            .query(
                "SELECT nspname FROM pg_namespace \
                 WHERE nspname NOT LIKE 'pg_%' \
                 AND nspname != 'information_schema' \
                 ORDER BY nspname",
                &[],
            )
            .await
            .map_err(map_err)?;

        // Tables, views and materialized views with their columns
        let rel_rows = self
            .client
            .query(
                "SELECT n.nspname, c.relname, c.relkind::text, \
                        a.attname, format_type(a.atttypid, a.atttypmod) \
                 FROM pg_class c \
                 JOIN pg_namespace n ON n.oid = c.relnamespace \
                 JOIN pg_attribute a ON a.attrelid = c.oid \
                 WHERE c.relkind IN ('r','p','v','m') \
                   AND n.nspname NOT LIKE 'pg_%' \
                   AND n.nspname != 'information_schema' \
                   AND a.attnum > 0 AND NOT a.attisdropped \
                 ORDER BY n.nspname, c.relname, a.attnum",
                &[],
            )
            .await
            .map_err(map_err)?;

        let pk_rows = self
            .client
            .query(
                "SELECT n.nspname, c.relname, a.attname \
                 FROM pg_constraint con \
                 JOIN pg_class c ON c.oid = con.conrelid \
                 JOIN pg_namespace n ON n.oid = c.relnamespace \
                 JOIN pg_attribute a ON a.attrelid = c.oid AND a.attnum = ANY(con.conkey) \
                 WHERE con.contype = 'p' \
                   AND n.nspname NOT LIKE 'pg_%' \
                   AND n.nspname != 'information_schema'",
                &[],
            )
            .await
            .map_err(map_err)?;

        let pk_set: HashSet<(String, String, String)> = pk_rows
            .iter()
            .map(|r| (r.get(0), r.get(1), r.get(2)))
            .collect();

        // (schema, relation) in catalog order, with kind and columns
        let mut relations: Vec<(String, String, String, Vec<SchemaNode>)> = Vec::new();
        let mut index: HashMap<(String, String), usize> = HashMap::new();
        for row in &rel_rows {
            let schema: String = row.get(0);
            let relname: String = row.get(1);
            let relkind: String = row.get(2);
            let column: String = row.get(3);
            let type_name: String = row.get(4);

            let key = (schema.clone(), relname.clone());
            let idx = *index.entry(key).or_insert_with(|| {
                relations.push((schema.clone(), relname.clone(), relkind, Vec::new()));
                relations.len() - 1
            });
            let is_pk = pk_set.contains(&(schema, relname, column.clone()));
            relations[idx].3.push(SchemaNode::column(
                column,
                datatype_from_format_type(&type_name),
                is_pk,
            ));
        }

        let mut by_schema: HashMap<String, Vec<SchemaNode>> = HashMap::new();
        for (schema, relname, relkind, columns) in relations {
            let node = match relkind.as_str() {
                "v" | "m" => SchemaNode::view(relname, columns),
                _ => SchemaNode::table(relname, columns),
            };
            by_schema.entry(schema).or_default().push(node);
        }

        Ok(schema_rows
            .iter()
            .map(|r| {
                let name: String = r.get(0);
                let mut children = by_schema.remove(&name).unwrap_or_default();
                // tables first, then views, each by name
                children.sort_by(|a, b| {
                    (a.kind != NodeKind::Table, &a.name).cmp(&(b.kind != NodeKind::Table, &b.name))
                });
                SchemaNode::schema(name, children)
            })
            .collect())
    }

    /// Send a cancel request for the currently running query.
    async fn cancel_query(&self) -> DbResult<()> {
        match self.ssl_mode {
            SslMode::Disable => self.cancel_token.cancel_query(tokio_postgres::NoTls).await,
            SslMode::Prefer | SslMode::Require => {
                let tls = tokio_postgres_rustls::MakeRustlsConnect::new(make_tls_config());
                self.cancel_token.cancel_query(tls).await
            }
        }
        .map_err(|e| DbError::QueryFailed(format!("Cancel failed: {}", e)))
    }

    async fn close(&self) -> DbResult<()> {
        // the socket closes when the client is dropped with the last handle
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

fn build_config(config: &PostgresConfig) -> tokio_postgres::Config {
    let mut pg = tokio_postgres::Config::new();
    pg.host(&config.host)
        .port(config.port)
        .dbname(&config.database)
        .user(&config.username)
        .application_name("worksheet")
        .connect_timeout(CONNECT_TIMEOUT)
        .ssl_mode(match config.ssl_mode {
            SslMode::Disable => tokio_postgres::config::SslMode::Disable,
            SslMode::Prefer => tokio_postgres::config::SslMode::Prefer,
            SslMode::Require => tokio_postgres::config::SslMode::Require,
        });
    if let Some(password) = config
        .password
        .clone()
        .or_else(|| std::env::var("PGPASSWORD").ok())
    {
        pg.password(password);
    }
    pg
}

/// Drive the connection in the background and report if it dies
fn watch_connection<F>(connection: F, lost: mpsc::UnboundedSender<String>)
where
    F: Future<Output = Result<(), tokio_postgres::Error>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::warn!(error = %e, "postgres connection lost");
            let _ = lost.send(format!("Connection lost: {}", e));
        }
    });
}

fn is_multi_statement(e: &tokio_postgres::Error) -> bool {
    e.code() == Some(&SqlState::SYNTAX_ERROR)
        && e.as_db_error()
            .is_some_and(|db| db.message().contains("multiple commands"))
}

fn query_error(e: tokio_postgres::Error) -> DbError {
    if e.code() == Some(&SqlState::QUERY_CANCELED) {
        return DbError::Cancelled;
    }
    DbError::QueryFailed(describe(&e))
}

/// Render a driver error the way psql would: severity, message, detail, hint
fn describe(e: &tokio_postgres::Error) -> String {
    let Some(db) = e.as_db_error() else {
        return e.to_string();
    };
    let mut msg = format!("{}: {}", db.severity(), db.message());
    if let Some(detail) = db.detail() {
        msg.push_str("\nDETAIL: ");
        msg.push_str(detail);
    }
    if let Some(hint) = db.hint() {
        msg.push_str("\nHINT: ");
        msg.push_str(hint);
    }
    msg
}

/// Map tokio_postgres Type to our DataType enum
fn pg_type_to_datatype(pg_type: &Type) -> DataType {
    let array = |inner| DataType::Array(Box::new(inner));
    match *pg_type {
        Type::INT2 => DataType::SmallInt,
        Type::INT4 => DataType::Integer,
        Type::INT8 => DataType::BigInt,
        Type::FLOAT4 => DataType::Real,
        Type::FLOAT8 => DataType::Double,
        Type::NUMERIC => DataType::Numeric,
        Type::TEXT | Type::NAME => DataType::Text,
        Type::VARCHAR => DataType::Varchar(None),
        Type::CHAR | Type::BPCHAR => DataType::Char(None),
        Type::BOOL => DataType::Boolean,
        Type::DATE => DataType::Date,
        Type::TIME => DataType::Time,
        Type::TIMESTAMP => DataType::Timestamp,
        Type::TIMESTAMPTZ => DataType::TimestampTz,
        Type::INTERVAL => DataType::Interval,
        Type::JSON => DataType::Json,
        Type::JSONB => DataType::Jsonb,
        Type::BYTEA => DataType::Bytea,
        Type::UUID => DataType::Uuid,
        Type::BOOL_ARRAY => array(DataType::Boolean),
        Type::INT2_ARRAY => array(DataType::SmallInt),
        Type::INT4_ARRAY => array(DataType::Integer),
        Type::INT8_ARRAY => array(DataType::BigInt),
        Type::FLOAT4_ARRAY => array(DataType::Real),
        Type::FLOAT8_ARRAY => array(DataType::Double),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY | Type::NAME_ARRAY => array(DataType::Text),
        Type::UUID_ARRAY => array(DataType::Uuid),
        Type::JSONB_ARRAY => array(DataType::Jsonb),
        Type::JSON_ARRAY => array(DataType::Json),
        Type::NUMERIC_ARRAY => array(DataType::Numeric),
        _ => DataType::Unknown(pg_type.name().to_string()),
    }
}

/// Map `format_type()` output (e.g. "character varying(255)",
/// "timestamp with time zone", "text[]") to our DataType enum.
fn datatype_from_format_type(type_name: &str) -> DataType {
    if let Some(inner) = type_name.strip_suffix("[]") {
        return DataType::Array(Box::new(datatype_from_format_type(inner)));
    }

    let (base, len) = match type_name.split_once('(') {
        Some((base, rest)) => (
            base.trim(),
            rest.trim_end_matches(')').parse::<usize>().ok(),
        ),
        None => (type_name.trim(), None),
    };

    match base {
        "smallint" => DataType::SmallInt,
        "integer" => DataType::Integer,
        "bigint" => DataType::BigInt,
        "real" => DataType::Real,
        "double precision" => DataType::Double,
        "numeric" => DataType::Numeric,
        "text" | "name" => DataType::Text,
        "character varying" => DataType::Varchar(len),
        "character" => DataType::Char(len),
        "boolean" => DataType::Boolean,
        "date" => DataType::Date,
        "time without time zone" | "time with time zone" => DataType::Time,
        "timestamp without time zone" => DataType::Timestamp,
        "timestamp with time zone" => DataType::TimestampTz,
        "interval" => DataType::Interval,
        "json" => DataType::Json,
        "jsonb" => DataType::Jsonb,
        "bytea" => DataType::Bytea,
        "uuid" => DataType::Uuid,
        other => DataType::Unknown(other.to_string()),
    }
}

/// Build a rustls ClientConfig that trusts OS certificates (with Mozilla roots as fallback)
fn make_tls_config() -> rustls::ClientConfig {
    let mut root_store = rustls::RootCertStore::empty();

    let native = rustls_native_certs::load_native_certs();
    let loaded = native
        .certs
        .into_iter()
        .filter(|cert| root_store.add(cert.clone()).is_ok())
        .count();
    if loaded == 0 {
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth()
}

/// Read column `idx` as `T`, falling back to text when the type does not match
fn get_as<'a, T, F>(row: &'a tokio_postgres::Row, idx: usize, convert: F) -> CellValue
where
    T: FromSql<'a>,
    F: FnOnce(T) -> CellValue,
{
    match row.try_get::<_, Option<T>>(idx) {
        Ok(Some(v)) => convert(v),
        Ok(None) => CellValue::Null,
        Err(_) => try_as_string(row, idx),
    }
}

fn integers<T: Into<i64>>(values: Vec<T>) -> CellValue {
    CellValue::Array(values.into_iter().map(|n| CellValue::Integer(n.into())).collect())
}

/// Extract a cell value from a tokio_postgres Row based on the column's DataType
fn extract_cell_value(row: &tokio_postgres::Row, idx: usize, data_type: &DataType) -> CellValue {
    match data_type {
        DataType::SmallInt => get_as(row, idx, |v: i16| CellValue::Integer(v.into())),
        DataType::Integer => get_as(row, idx, |v: i32| CellValue::Integer(v.into())),
        DataType::BigInt => get_as(row, idx, CellValue::Integer),
        DataType::Real => get_as(row, idx, |v: f32| CellValue::Float(v.into())),
        DataType::Double => get_as(row, idx, CellValue::Float),
        DataType::Numeric => get_as(row, idx, |v: Decimal| CellValue::Text(v.to_string())),
        DataType::Boolean => get_as(row, idx, CellValue::Boolean),
        DataType::Json | DataType::Jsonb => get_as(row, idx, CellValue::Json),
        DataType::Bytea => get_as(row, idx, CellValue::Binary),
        DataType::Uuid => get_as(row, idx, |v: uuid::Uuid| CellValue::Uuid(v.to_string())),
        DataType::Timestamp => get_as(row, idx, |v: chrono::NaiveDateTime| {
            CellValue::DateTime(v.to_string())
        }),
        DataType::TimestampTz => get_as(row, idx, |v: chrono::DateTime<chrono::Utc>| {
            CellValue::DateTime(v.to_string())
        }),
        DataType::Date => get_as(row, idx, |v: chrono::NaiveDate| {
            CellValue::DateTime(v.to_string())
        }),
        DataType::Time => get_as(row, idx, |v: chrono::NaiveTime| {
            CellValue::DateTime(v.to_string())
        }),
        DataType::Array(inner) => extract_array_value(row, idx, inner),
        _ => try_as_string(row, idx),
    }
}

/// Extract an array column, element type first, text as the fallback
fn extract_array_value(row: &tokio_postgres::Row, idx: usize, inner: &DataType) -> CellValue {
    match inner {
        DataType::Text | DataType::Varchar(_) | DataType::Char(_) => {
            get_as(row, idx, |v: Vec<String>| {
                CellValue::Array(v.into_iter().map(CellValue::Text).collect())
            })
        }
        DataType::SmallInt => get_as(row, idx, integers::<i16>),
        DataType::Integer => get_as(row, idx, integers::<i32>),
        DataType::BigInt => get_as(row, idx, integers::<i64>),
        DataType::Real => get_as(row, idx, |v: Vec<f32>| {
            CellValue::Array(v.into_iter().map(|n| CellValue::Float(n.into())).collect())
        }),
        DataType::Double => get_as(row, idx, |v: Vec<f64>| {
            CellValue::Array(v.into_iter().map(CellValue::Float).collect())
        }),
        DataType::Boolean => get_as(row, idx, |v: Vec<bool>| {
            CellValue::Array(v.into_iter().map(CellValue::Boolean).collect())
        }),
        DataType::Uuid => get_as(row, idx, |v: Vec<uuid::Uuid>| {
            CellValue::Array(v.into_iter().map(|u| CellValue::Uuid(u.to_string())).collect())
        }),
        DataType::Json | DataType::Jsonb => get_as(row, idx, |v: Vec<serde_json::Value>| {
            CellValue::Array(v.into_iter().map(CellValue::Json).collect())
        }),
        DataType::Numeric => get_as(row, idx, |v: Vec<Decimal>| {
            CellValue::Array(v.into_iter().map(|d| CellValue::Text(d.to_string())).collect())
        }),
        _ => try_as_string(row, idx),
    }
}

/// Try to extract a value as a string (fallback for type mismatches).
///
/// When even that fails, the cell names the postgres type that could not
/// be displayed.
fn try_as_string(row: &tokio_postgres::Row, idx: usize) -> CellValue {
    match row.try_get::<_, Option<String>>(idx) {
        Ok(Some(v)) => CellValue::Text(v),
        Ok(None) => CellValue::Null,
        Err(_) => {
            let type_name = row
                .columns()
                .get(idx)
                .map_or("unknown", |c| c.type_().name());
            CellValue::Text(format!("<unable to display: {}>", type_name))
        }
    }
}
