//! Schema discovery for the query translator.

use tif_core::AppResult;

use crate::csv::quote_ident;
use crate::store::{CellValue, TabularStore};

/// Column naming the TIF district of a report row.
pub const DISTRICT_COLUMN: &str = "TIF District";

/// Column holding the reporting year.
pub const YEAR_COLUMN: &str = "Report Year";

/// Expenditure category columns summed by the example query.
pub const CATEGORY_COLUMNS: &[&str] = &[
    "Cost of Studies",
    "Administrative Cost",
    "Marketing Sites",
    "Site Preparation Costs",
    "Renovation, Rehab, Etc.",
    "Public Works",
    "Removing Contaminants",
    "Job Training",
    "Financing Costs",
    "Capital Costs",
    "School Districts",
    "Library Districts",
    "Relocation Costs",
    "In Lieu of Taxes",
    "Job Training/Retraining",
    "Interest Cost",
    "New Housing",
    "Day Care Services",
    "Other",
];

const SAMPLE_LIMIT: usize = 5;

/// What the translator needs to know about the expenditure table.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaInfo {
    pub table: String,
    pub columns: Vec<String>,
    pub sample_districts: Vec<CellValue>,
    pub sample_years: Vec<CellValue>,
}

/// Read column names and sample values from `table`.
pub fn discover_schema(store: &dyn TabularStore, table: &str) -> AppResult<SchemaInfo> {
    let columns = store
        .execute(&format!("SELECT * FROM {} LIMIT 0", quote_ident(table)))?
        .columns;

    let sample = |column: &str| -> AppResult<Vec<CellValue>> {
        if !columns.iter().any(|c| c == column) {
            return Ok(Vec::new());
        }
        let col = quote_ident(column);
        let out = store.execute(&format!(
            "SELECT DISTINCT {col} FROM {table} WHERE {col} IS NOT NULL LIMIT {limit}",
            col = col,
            table = quote_ident(table),
            limit = SAMPLE_LIMIT
        ))?;
        Ok(out.rows.into_iter().filter_map(|r| r.into_iter().next()).collect())
    };

    let sample_districts = sample(DISTRICT_COLUMN)?;
    let sample_years = sample(YEAR_COLUMN)?;

    tracing::debug!(
        table,
        columns = columns.len(),
        districts = sample_districts.len(),
        years = sample_years.len(),
        "Discovered schema"
    );

    Ok(SchemaInfo {
        table: table.to_string(),
        columns,
        sample_districts,
        sample_years,
    })
}

impl SchemaInfo {
    /// Example query summing every category column present in the table.
    fn example_query(&self) -> Option<String> {
        let district = self.sample_districts.first()?;
        let year = self.sample_years.first()?;

        let categories: Vec<String> = CATEGORY_COLUMNS
            .iter()
            .filter(|c| self.columns.iter().any(|col| col == *c))
            .map(|c| quote_ident(c))
            .collect();
        if categories.is_empty() {
            return None;
        }

        let year = match year {
            CellValue::Text(t) => sql_literal(t),
            other => other.to_string(),
        };

        Some(format!(
            "Example: SELECT SUM({sum}) AS total_spent\nFROM {table}\nWHERE {dcol} = {district} AND {ycol} = {year}",
            sum = categories.join(" + "),
            table = self.table,
            dcol = quote_ident(DISTRICT_COLUMN),
            district = sql_literal(&district.to_string()),
            ycol = quote_ident(YEAR_COLUMN),
            year = year,
        ))
    }

    /// System prompt for translating a question into SQL over this table.
    pub fn prompt_context(&self) -> String {
        let columns_list: Vec<String> = self.columns.iter().map(|c| format!("- `{}`", c)).collect();
        let join = |values: &[CellValue]| {
            values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut prompt = String::new();
        prompt.push_str(
            "You are a SQL expert. You will be given a natural language query about TIF (Tax Increment Financing) expenditures.\n\n",
        );
        prompt.push_str(&format!(
            "The data is stored in a table called '{}' with the following columns:\n{}\n\n",
            self.table,
            columns_list.join("\n")
        ));
        prompt.push_str(&format!("Sample districts: {}\n", join(&self.sample_districts)));
        prompt.push_str(&format!("Sample years: {}\n\n", join(&self.sample_years)));
        if let Some(example) = self.example_query() {
            prompt.push_str(&example);
            prompt.push_str("\n\n");
        }
        prompt.push_str(
            "Convert the natural language query to SQL. Return ONLY the SQL query without any explanation.\n\n",
        );
        prompt.push_str(
            "IMPORTANT: Column names must be quoted with double quotes since they contain spaces.",
        );
        prompt
    }
}

fn sql_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    fn store() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store
            .execute_batch(
                r#"
                CREATE TABLE expenditures (
                    "TIF District" TEXT, "Report Year" INTEGER,
                    "Public Works" REAL, "New Housing" REAL, "Notes" TEXT
                );
                INSERT INTO expenditures VALUES ('O''Hare', 2019, 10, 20, NULL);
                INSERT INTO expenditures VALUES ('O''Hare', 2020, 5, 0, NULL);
                INSERT INTO expenditures VALUES ('Canal/Congress', 2019, 1, 2, 'x');
                "#,
            )
            .unwrap();
        store
    }

    #[test]
    fn test_discover_schema_samples_distinct_values() {
        let schema = discover_schema(&store(), "expenditures").unwrap();
        assert_eq!(schema.columns.len(), 5);
        assert_eq!(schema.sample_districts.len(), 2);
        assert_eq!(
            schema.sample_years,
            vec![CellValue::Integer(2019), CellValue::Integer(2020)]
        );
    }

    #[test]
    fn test_prompt_context_lists_columns_and_example() {
        let schema = discover_schema(&store(), "expenditures").unwrap();
        let prompt = schema.prompt_context();

        assert!(prompt.contains("table called 'expenditures'"));
        assert!(prompt.contains("- `Report Year`"));
        assert!(prompt.contains(r#"SUM("Public Works" + "New Housing")"#));
        assert!(prompt.contains(r#""TIF District" = 'O''Hare' AND "Report Year" = 2019"#));
        assert!(prompt.contains("Return ONLY the SQL query"));
        assert!(prompt.contains("double quotes"));
    }

    #[test]
    fn test_schema_without_samples_has_no_example() {
        let store = SqliteStore::in_memory().unwrap();
        store.execute_batch("CREATE TABLE t (a INTEGER);").unwrap();

        let schema = discover_schema(&store, "t").unwrap();
        assert!(schema.sample_districts.is_empty());
        assert!(!schema.prompt_context().contains("Example:"));
    }

    #[test]
    fn test_missing_table_is_error() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(discover_schema(&store, "expenditures").is_err());
    }
}
