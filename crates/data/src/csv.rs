//! CSV ingestion into SQLite.
//!
//! Column affinities are inferred from the data: a column is `INTEGER` if
//! every non-empty value parses as `i64`, `REAL` if every one parses as
//! `f64`, otherwise `TEXT`. Empty fields load as NULL.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;
use tif_core::{AppError, AppResult};

/// Outcome of a CSV load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadStats {
    pub table: String,
    pub columns: usize,
    pub rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    fn sql(&self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }

    fn to_value(self, raw: &str) -> Value {
        let raw = raw.trim();
        if raw.is_empty() {
            return Value::Null;
        }
        match self {
            Self::Integer => raw
                .parse::<i64>()
                .map(Value::Integer)
                .unwrap_or_else(|_| Value::Text(raw.to_string())),
            Self::Real => raw
                .parse::<f64>()
                .map(Value::Real)
                .unwrap_or_else(|_| Value::Text(raw.to_string())),
            Self::Text => Value::Text(raw.to_string()),
        }
    }
}

/// Quote an SQL identifier with double quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Split one CSV record into fields, honoring quoted commas and doubled quotes.
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => result.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    result.push(current);
    result
}

/// Split CSV text into records. A quoted field may span several lines.
fn read_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut pending = String::new();

    for line in text.lines() {
        if !pending.is_empty() {
            pending.push('\n');
        }
        pending.push_str(line);

        // Odd quote count means a quoted field is still open.
        if pending.matches('"').count() % 2 == 1 {
            continue;
        }

        if !pending.trim().is_empty() {
            records.push(split_csv_line(&pending));
        }
        pending.clear();
    }

    if !pending.trim().is_empty() {
        records.push(split_csv_line(&pending));
    }

    records
}

fn infer_types(columns: usize, rows: &[Vec<String>]) -> Vec<ColumnType> {
    (0..columns)
        .map(|i| {
            let mut ty = ColumnType::Integer;
            for value in rows.iter().filter_map(|r| r.get(i)).map(|v| v.trim()) {
                if value.is_empty() {
                    continue;
                }
                if ty == ColumnType::Integer && value.parse::<i64>().is_err() {
                    ty = ColumnType::Real;
                }
                if ty == ColumnType::Real && value.parse::<f64>().is_err() {
                    ty = ColumnType::Text;
                    break;
                }
            }
            ty
        })
        .collect()
}

/// Load a CSV file into `table`, replacing any existing table of that name.
pub fn load_csv(conn: &mut Connection, csv_path: &Path, table: &str) -> AppResult<LoadStats> {
    tracing::info!("Loading {:?} into table '{}'", csv_path, table);

    let text = std::fs::read_to_string(csv_path).map_err(|e| {
        AppError::Data(format!("Failed to read CSV file {:?}: {}", csv_path, e))
    })?;
    // Byte-order marks from spreadsheet exports would end up in the first column name.
    let text = text.trim_start_matches('\u{feff}');

    let mut records = read_records(text).into_iter();
    let header: Vec<String> = records
        .next()
        .ok_or_else(|| AppError::Data(format!("CSV file {:?} is empty", csv_path)))?
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();

    if header.iter().any(|h| h.is_empty()) {
        return Err(AppError::Data(format!(
            "CSV file {:?} has an empty column name",
            csv_path
        )));
    }

    let rows: Vec<Vec<String>> = records.collect();
    let types = infer_types(header.len(), &rows);

    let column_defs: Vec<String> = header
        .iter()
        .zip(&types)
        .map(|(name, ty)| format!("{} {}", quote_ident(name), ty.sql()))
        .collect();

    let tx = conn
        .transaction()
        .map_err(|e| AppError::Data(format!("Failed to begin transaction: {}", e)))?;

    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {table}; CREATE TABLE {table} ({columns});",
        table = quote_ident(table),
        columns = column_defs.join(", ")
    ))
    .map_err(|e| AppError::Data(format!("Failed to create table '{}': {}", table, e)))?;

    {
        let placeholders = vec!["?"; header.len()].join(", ");
        let mut stmt = tx
            .prepare(&format!(
                "INSERT INTO {} VALUES ({})",
                quote_ident(table),
                placeholders
            ))
            .map_err(|e| AppError::Data(format!("Failed to prepare insert: {}", e)))?;

        for (line, row) in rows.iter().enumerate() {
            if row.len() != header.len() {
                tracing::warn!(
                    "Row {} has {} fields, expected {}; padding/truncating",
                    line + 2,
                    row.len(),
                    header.len()
                );
            }

            let values = types.iter().enumerate().map(|(i, ty)| {
                row.get(i)
                    .map(|raw| ty.to_value(raw))
                    .unwrap_or(Value::Null)
            });

            stmt.execute(params_from_iter(values))
                .map_err(|e| AppError::Data(format!("Failed to insert row {}: {}", line + 2, e)))?;
        }
    }

    tx.commit()
        .map_err(|e| AppError::Data(format!("Failed to commit CSV load: {}", e)))?;

    tracing::info!(
        "Loaded {} rows x {} columns into '{}'",
        rows.len(),
        header.len(),
        table
    );

    Ok(LoadStats {
        table: table.to_string(),
        columns: header.len(),
        rows: rows.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_split_plain_line() {
        assert_eq!(split_csv_line("a,b,,c"), vec!["a", "b", "", "c"]);
    }

    #[test]
    fn test_split_quoted_comma_and_escaped_quote() {
        let fields = split_csv_line(r#"1,"Renovation, Rehab, Etc.","say ""hi""""#);
        assert_eq!(fields, vec!["1", "Renovation, Rehab, Etc.", r#"say "hi""#]);
    }

    #[test]
    fn test_records_with_embedded_newline() {
        let records = read_records("a,b\n\"line one\nline two\",2\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1][0], "line one\nline two");
    }

    #[test]
    fn test_type_inference() {
        let rows = vec![
            vec!["2019".to_string(), "1.5".to_string(), "Alpha".to_string()],
            vec!["2020".to_string(), "2".to_string(), "".to_string()],
        ];
        assert_eq!(
            infer_types(3, &rows),
            vec![ColumnType::Integer, ColumnType::Real, ColumnType::Text]
        );
    }

    #[test]
    fn test_load_csv_creates_typed_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tif.csv");
        fs::write(
            &path,
            "\u{feff}TIF District,Report Year,\"Renovation, Rehab, Etc.\"\n\
             Canal/Congress,2019,1000.5\n\
             Jefferson Park,2020,\n",
        )
        .unwrap();

        let mut conn = Connection::open_in_memory().unwrap();
        let stats = load_csv(&mut conn, &path, "expenditures").unwrap();
        assert_eq!(stats.rows, 2);
        assert_eq!(stats.columns, 3);

        let year_type: String = conn
            .query_row(
                "SELECT type FROM pragma_table_info('expenditures') WHERE name = 'Report Year'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(year_type, "INTEGER");

        let nulls: i64 = conn
            .query_row(
                r#"SELECT COUNT(*) FROM expenditures WHERE "Renovation, Rehab, Etc." IS NULL"#,
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(nulls, 1);
    }

    #[test]
    fn test_load_csv_replaces_existing_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tif.csv");
        fs::write(&path, "a\n1\n2\n").unwrap();

        let mut conn = Connection::open_in_memory().unwrap();
        load_csv(&mut conn, &path, "t").unwrap();
        load_csv(&mut conn, &path, "t").unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_load_missing_file() {
        let mut conn = Connection::open_in_memory().unwrap();
        let result = load_csv(&mut conn, Path::new("/nonexistent/tif.csv"), "t");
        assert!(matches!(result, Err(AppError::Data(_))));
    }
}
