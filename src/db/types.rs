//! Database type definitions
//!
//! Core data structures for representing database query results,
//! data types, and values.

use crate::error::{DbError, DbResult};
use std::time::Duration;

/// Query execution results.
///
/// Immutable once built: a re-execution produces a new value rather than
/// mutating this one, so it can be shared between the tab and the viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResults {
    columns: Vec<ColumnDef>,
    rows: Vec<Row>,
    execution_time: Duration,
    rows_affected: Option<u64>,
}

/// Alias used by the viewer and tabs
pub type ResultSet = QueryResults;

/// Column definition in query results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Data type
    pub data_type: DataType,
}

/// Database data types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    // Integer types
    SmallInt,
    Integer,
    BigInt,

    // Floating point
    Real,
    Double,
    Numeric,

    // Text types
    Text,
    Varchar(Option<usize>),
    Char(Option<usize>),

    // Boolean
    Boolean,

    // Date/time types
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Interval,

    // JSON types
    Json,
    Jsonb,

    // Binary data
    Bytea,

    // UUID
    Uuid,

    // Array type
    Array(Box<DataType>),

    // Other/unknown types
    Unknown(String),
}

/// A single row of query results
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Cell values in column order
    pub values: Vec<CellValue>,
}

/// A cell value (single column value in a row)
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// NULL value
    Null,

    /// Integer value
    Integer(i64),

    /// Floating point value
    Float(f64),

    /// Text/string value
    Text(String),

    /// Boolean value
    Boolean(bool),

    /// JSON value (parsed)
    Json(serde_json::Value),

    /// Binary data
    Binary(Vec<u8>),

    /// Date/time value, already rendered by the driver
    DateTime(String),

    /// UUID value
    Uuid(String),

    /// Array value
    Array(Vec<CellValue>),
}

impl QueryResults {
    /// Build a row-returning result, rejecting rows whose width differs
    /// from the column count.
    pub fn new(columns: Vec<ColumnDef>, rows: Vec<Row>, execution_time: Duration) -> DbResult<Self> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.values.len() != columns.len())
        {
            return Err(DbError::MalformedResult(format!(
                "row {} has {} values but there are {} columns",
                idx,
                row.values.len(),
                columns.len()
            )));
        }
        Ok(Self {
            columns,
            rows,
            execution_time,
            rows_affected: None,
        })
    }

    /// Result of a statement that returns no rows (INSERT, DDL, ...)
    pub fn command(rows_affected: u64, execution_time: Duration) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            execution_time,
            rows_affected: Some(rows_affected),
        }
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn execution_time(&self) -> Duration {
        self.execution_time
    }

    /// Rows affected, for statements that return no result set
    pub fn rows_affected(&self) -> Option<u64> {
        self.rows_affected
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// True for DML/DDL results that carry no grid
    pub fn is_command(&self) -> bool {
        self.rows_affected.is_some()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.values.get(col))
    }
}

impl DataType {
    /// Get a human-readable display name for this type
    pub fn display_name(&self) -> String {
        match self {
            DataType::SmallInt => "smallint".to_string(),
            DataType::Integer => "integer".to_string(),
            DataType::BigInt => "bigint".to_string(),
            DataType::Real => "real".to_string(),
            DataType::Double => "double precision".to_string(),
            DataType::Numeric => "numeric".to_string(),
            DataType::Text => "text".to_string(),
            DataType::Varchar(Some(n)) => format!("varchar({})", n),
            DataType::Varchar(None) => "varchar".to_string(),
            DataType::Char(Some(n)) => format!("char({})", n),
            DataType::Char(None) => "char".to_string(),
            DataType::Boolean => "boolean".to_string(),
            DataType::Date => "date".to_string(),
            DataType::Time => "time".to_string(),
            DataType::Timestamp => "timestamp".to_string(),
            DataType::TimestampTz => "timestamptz".to_string(),
            DataType::Interval => "interval".to_string(),
            DataType::Json => "json".to_string(),
            DataType::Jsonb => "jsonb".to_string(),
            DataType::Bytea => "bytea".to_string(),
            DataType::Uuid => "uuid".to_string(),
            DataType::Array(inner) => format!("{}[]", inner.display_name()),
            DataType::Unknown(s) => s.clone(),
        }
    }

    /// Map a SQLite declared column type using SQLite's affinity rules.
    ///
    /// An empty declaration (expressions, `SELECT 1`) has no affinity and
    /// maps to `Unknown("")`.
    pub fn from_sqlite_decl(decl: &str) -> DataType {
        let upper = decl.trim().to_ascii_uppercase();
        if upper.is_empty() {
            return DataType::Unknown(String::new());
        }
        let param = upper
            .split_once('(')
            .and_then(|(_, rest)| rest.trim_end_matches(')').split(',').next())
            .and_then(|n| n.trim().parse::<usize>().ok());

        if upper.contains("INT") {
            DataType::Integer
        } else if upper.starts_with("VARCHAR") || upper.contains("VARYING") {
            DataType::Varchar(param)
        } else if upper.starts_with("CHAR") || upper.starts_with("NCHAR") {
            DataType::Char(param)
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            DataType::Text
        } else if upper.contains("BLOB") {
            DataType::Bytea
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            DataType::Double
        } else if upper.starts_with("BOOL") {
            DataType::Boolean
        } else if upper == "DATE" {
            DataType::Date
        } else if upper.starts_with("DATETIME") || upper.starts_with("TIMESTAMP") {
            DataType::Timestamp
        } else if upper == "JSON" {
            DataType::Json
        } else if upper.starts_with("NUMERIC") || upper.starts_with("DECIMAL") {
            DataType::Numeric
        } else {
            DataType::Unknown(decl.trim().to_string())
        }
    }
}

impl CellValue {
    /// Get a display string for this cell value (truncated if needed)
    pub fn display_string(&self, max_len: usize) -> String {
        let full = match self {
            CellValue::Null => "NULL".to_string(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Boolean(b) => b.to_string(),
            CellValue::Json(v) => v.to_string(),
            CellValue::Binary(b) => format!("<binary {} bytes>", b.len()),
            CellValue::DateTime(s) => s.clone(),
            CellValue::Uuid(s) => s.clone(),
            CellValue::Array(arr) => {
                let items: Vec<String> = arr.iter().map(|v| v.display_string(max_len)).collect();
                format!("{{{}}}", items.join(","))
            }
        };

        if full.chars().count() > max_len {
            let kept: String = full.chars().take(max_len.saturating_sub(3)).collect();
            format!("{}...", kept)
        } else {
            full
        }
    }

    /// Check if this is a NULL value
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}
