//! The four capabilities the delegate may request, and their catalog.

use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use sha2::{Digest, Sha256};
use tif_core::{AppError, AppResult};
use tif_llm::{ToolCall, ToolDefinition};

pub const GET_SCHEMA_INFO: &str = "get_schema_info";
pub const QUERY_SQL_DATABASE: &str = "query_sql_database";
pub const SEARCH_PDF_DOCUMENTS: &str = "search_pdf_documents";
pub const HUMANIZE_RESULT: &str = "humanize_result";

/// Sources-used label for structured queries.
pub const STRUCTURED_DATA_LABEL: &str = "structured data";

/// Sources-used label for document searches.
pub const DOCUMENTS_LABEL: &str = "documents";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StructuredQueryArgs {
    /// Natural-language question to translate into SQL
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DocumentSearchArgs {
    pub query: String,
}

/// Where a technical result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Sql,
    Pdf,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HumanizeArgs {
    pub original_query: String,
    pub technical_result: String,
    pub source: ResultSource,
}

/// A parsed capability request.
#[derive(Debug, Clone, PartialEq)]
pub enum Capability {
    FetchSchema,
    RunStructuredQuery(StructuredQueryArgs),
    SearchDocuments(DocumentSearchArgs),
    Humanize(HumanizeArgs),
}

impl Capability {
    /// Parse a tool call.
    ///
    /// Returns `Ok(None)` for a name outside the catalog. Malformed arguments
    /// for a known name are `AppError::Capability`.
    pub fn parse(call: &ToolCall) -> AppResult<Option<Self>> {
        let capability = match call.name.as_str() {
            GET_SCHEMA_INFO => Self::FetchSchema,
            QUERY_SQL_DATABASE => Self::RunStructuredQuery(parse_args(call)?),
            SEARCH_PDF_DOCUMENTS => Self::SearchDocuments(parse_args(call)?),
            HUMANIZE_RESULT => Self::Humanize(parse_args(call)?),
            _ => return Ok(None),
        };
        Ok(Some(capability))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FetchSchema => GET_SCHEMA_INFO,
            Self::RunStructuredQuery(_) => QUERY_SQL_DATABASE,
            Self::SearchDocuments(_) => SEARCH_PDF_DOCUMENTS,
            Self::Humanize(_) => HUMANIZE_RESULT,
        }
    }

    /// Label added to the sources-used set when this capability runs.
    pub fn source_label(&self) -> Option<&'static str> {
        match self {
            Self::RunStructuredQuery(_) => Some(STRUCTURED_DATA_LABEL),
            Self::SearchDocuments(_) => Some(DOCUMENTS_LABEL),
            Self::FetchSchema | Self::Humanize(_) => None,
        }
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(call: &ToolCall) -> AppResult<T> {
    serde_json::from_str(raw_arguments(call)).map_err(|e| {
        AppError::Capability(format!("invalid arguments for {}: {}", call.name, e))
    })
}

fn raw_arguments(call: &ToolCall) -> &str {
    let trimmed = call.arguments.trim();
    if trimmed.is_empty() {
        "{}"
    } else {
        trimmed
    }
}

/// Deterministic digest of a call's arguments.
///
/// Key order and whitespace do not change the result.
pub fn signature(call: &ToolCall) -> AppResult<String> {
    let value: Value = serde_json::from_str(raw_arguments(call)).map_err(|e| {
        AppError::Capability(format!("invalid arguments for {}: {}", call.name, e))
    })?;
    let canonical = serde_json::to_string(&canonicalize(value))?;

    Ok(format!("{:x}", Sha256::digest(canonical.as_bytes())))
}

/// Rebuild objects with their keys in sorted order, recursively.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Tool definitions offered to the delegate on every round.
pub fn catalog() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: GET_SCHEMA_INFO.to_string(),
            description: "Get information about the database schema and example queries"
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        ToolDefinition {
            name: QUERY_SQL_DATABASE.to_string(),
            description: "Query the TIF expenditures database using natural language".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The natural language query to convert to SQL and execute"
                    }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: SEARCH_PDF_DOCUMENTS.to_string(),
            description: "Search through TIF PDF documents and reports".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query to find relevant information in PDFs"
                    }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: HUMANIZE_RESULT.to_string(),
            description: "Convert a technical result into a human-friendly response".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "original_query": {
                        "type": "string",
                        "description": "The user's original question"
                    },
                    "technical_result": {
                        "type": "string",
                        "description": "The technical result to be humanized"
                    },
                    "source": {
                        "type": "string",
                        "description": "The source of the data (sql or pdf)",
                        "enum": ["sql", "pdf"]
                    }
                },
                "required": ["original_query", "technical_result", "source"]
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: "call_0".to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[test]
    fn test_parse_each_capability() {
        assert_eq!(
            Capability::parse(&call(GET_SCHEMA_INFO, "")).unwrap(),
            Some(Capability::FetchSchema)
        );
        assert_eq!(
            Capability::parse(&call(QUERY_SQL_DATABASE, r#"{"query":"total 2023"}"#)).unwrap(),
            Some(Capability::RunStructuredQuery(StructuredQueryArgs {
                query: "total 2023".to_string()
            }))
        );

        let humanize = Capability::parse(&call(
            HUMANIZE_RESULT,
            r#"{"original_query":"q","technical_result":"r","source":"pdf"}"#,
        ))
        .unwrap();
        assert!(matches!(
            humanize,
            Some(Capability::Humanize(HumanizeArgs {
                source: ResultSource::Pdf,
                ..
            }))
        ));
    }

    #[test]
    fn test_unknown_name_is_not_an_error() {
        assert_eq!(Capability::parse(&call("drop_tables", "{}")).unwrap(), None);
    }

    #[test]
    fn test_malformed_arguments_are_rejected() {
        let err = Capability::parse(&call(SEARCH_PDF_DOCUMENTS, "{not json")).unwrap_err();
        assert!(matches!(err, AppError::Capability(_)));

        let missing = Capability::parse(&call(QUERY_SQL_DATABASE, "{}")).unwrap_err();
        assert!(missing.to_string().contains("query_sql_database"));

        let bad_source = Capability::parse(&call(
            HUMANIZE_RESULT,
            r#"{"original_query":"q","technical_result":"r","source":"csv"}"#,
        ));
        assert!(bad_source.is_err());
    }

    #[test]
    fn test_signature_ignores_formatting_and_key_order() {
        let a = signature(&call(HUMANIZE_RESULT, r#"{"a":1,"b":"x"}"#)).unwrap();
        let b = signature(&call(HUMANIZE_RESULT, r#"{ "b": "x",  "a": 1 }"#)).unwrap();
        let c = signature(&call(HUMANIZE_RESULT, r#"{"a":2,"b":"x"}"#)).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_catalog_required_fields() {
        let tools = catalog();
        assert_eq!(tools.len(), 4);

        let humanize = tools.iter().find(|t| t.name == HUMANIZE_RESULT).unwrap();
        assert_eq!(
            humanize.parameters["required"],
            json!(["original_query", "technical_result", "source"])
        );
        assert_eq!(humanize.parameters["properties"]["source"]["enum"], json!(["sql", "pdf"]));

        for name in [QUERY_SQL_DATABASE, SEARCH_PDF_DOCUMENTS] {
            let tool = tools.iter().find(|t| t.name == name).unwrap();
            assert_eq!(tool.parameters["required"], json!(["query"]));
        }
    }

    #[test]
    fn test_source_labels() {
        let sql = Capability::RunStructuredQuery(StructuredQueryArgs {
            query: "q".to_string(),
        });
        assert_eq!(sql.source_label(), Some(STRUCTURED_DATA_LABEL));
        assert_eq!(Capability::FetchSchema.source_label(), None);
    }
}
