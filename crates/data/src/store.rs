//! SQLite-backed tabular store.

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tif_core::{AppError, AppResult};

use crate::csv::{load_csv, quote_ident, LoadStats};

/// A single result cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<ValueRef<'_>> for CellValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(i) => Self::Integer(i),
            ValueRef::Real(f) => Self::Real(f),
            ValueRef::Text(t) => Self::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Self::Blob(b.to_vec()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Real(r) => write!(f, "{}", r),
            Self::Text(t) => write!(f, "{}", t),
            Self::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// Rows returned by a query, with their column names.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl QueryOutput {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Render as plain text: a header line, then one line per row.
    pub fn render_table(&self) -> String {
        let mut out = self.columns.join(" | ");
        for row in &self.rows {
            out.push('\n');
            let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
            out.push_str(&cells.join(" | "));
        }
        out
    }
}

/// Executes query strings against structured records.
pub trait TabularStore: Send + Sync {
    /// Run one SQL statement and collect every row.
    ///
    /// Malformed SQL and execution failures are `AppError::Data`.
    fn execute(&self, sql: &str) -> AppResult<QueryOutput>;
}

/// SQLite implementation of [`TabularStore`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Data(format!("Failed to create database directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Data(format!("Failed to open SQLite database: {}", e)))?;

        tracing::debug!("Opened tabular store at {:?}", db_path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Data(format!("Failed to open in-memory database: {}", e)))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Data("Tabular store lock poisoned".to_string()))
    }

    /// Replace `table` with the contents of a CSV file.
    pub fn load_csv(&self, csv_path: &Path, table: &str) -> AppResult<LoadStats> {
        let mut conn = self.lock()?;
        load_csv(&mut conn, csv_path, table)
    }

    /// Run a batch of statements that return no rows.
    pub fn execute_batch(&self, sql: &str) -> AppResult<()> {
        self.lock()?
            .execute_batch(sql)
            .map_err(|e| AppError::Data(e.to_string()))
    }

    pub fn table_exists(&self, table: &str) -> AppResult<bool> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .map_err(|e| AppError::Data(format!("Failed to inspect tables: {}", e)))?;
        Ok(count > 0)
    }

    pub fn row_count(&self, table: &str) -> AppResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
                [],
                |row| row.get(0),
            )
            .map_err(|e| AppError::Data(e.to_string()))?;
        Ok(count as usize)
    }
}

impl TabularStore for SqliteStore {
    fn execute(&self, sql: &str) -> AppResult<QueryOutput> {
        tracing::debug!(sql, "Executing SQL");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(|e| AppError::Data(e.to_string()))?;

        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();

        let mut rows = Vec::new();
        let mut cursor = stmt.query([]).map_err(|e| AppError::Data(e.to_string()))?;
        while let Some(row) = cursor.next().map_err(|e| AppError::Data(e.to_string()))? {
            let mut cells = Vec::with_capacity(width);
            for i in 0..width {
                let value = row.get_ref(i).map_err(|e| AppError::Data(e.to_string()))?;
                cells.push(CellValue::from(value));
            }
            rows.push(cells);
        }

        tracing::debug!(rows = rows.len(), "SQL returned");
        Ok(QueryOutput { columns, rows })
    }
}
