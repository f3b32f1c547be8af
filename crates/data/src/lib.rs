//! Tabular expenditure data for the TIF agent.
//!
//! Loads the expenditure CSV into SQLite, executes generated SQL against it
//! and describes its schema for the query translator.

pub mod csv;
pub mod schema;
pub mod store;

pub use csv::{load_csv, LoadStats};
pub use schema::{discover_schema, SchemaInfo};
pub use store::{CellValue, QueryOutput, SqliteStore, TabularStore};
