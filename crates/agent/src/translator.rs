//! Natural-language question to SQL.

use std::sync::Arc;
use tif_llm::{LlmClient, LlmRequest};

/// Prefix of the text returned when the delegate call fails. Starts with
/// `--` so the result is never executed.
pub const LLM_ERROR_PREFIX: &str = "-- LLM error: ";

pub struct QueryTranslator {
    llm: Arc<dyn LlmClient>,
    model: String,
}

impl QueryTranslator {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// Translate `question` into a SQL string.
    ///
    /// The schema description is the system prompt. Never fails: a delegate
    /// error comes back as a `-- LLM error: ...` comment.
    pub async fn translate(&self, question: &str, schema_description: &str) -> String {
        let request = LlmRequest::new(question, &self.model)
            .with_system(schema_description)
            .with_temperature(0.0);

        match self.llm.complete(&request).await {
            Ok(response) => {
                let sql = strip_fences(&response.content);
                tracing::debug!("Generated SQL: {}", sql);
                sql
            }
            Err(e) => {
                tracing::warn!("SQL translation failed: {}", e);
                format!("{}{}", LLM_ERROR_PREFIX, e)
            }
        }
    }
}

/// A translation that starts with a SQL comment marker is a refusal or a
/// delegate error and must not be executed.
pub fn is_translation_failure(sql: &str) -> bool {
    sql.trim_start().starts_with("--")
}

/// Remove a surrounding ```sql / ``` fence and trim.
pub fn strip_fences(text: &str) -> String {
    let mut sql = text.trim();

    if let Some(rest) = sql.strip_prefix("```sql") {
        sql = rest;
    } else if let Some(rest) = sql.strip_prefix("```") {
        sql = rest;
    }
    if let Some(rest) = sql.strip_suffix("```") {
        sql = rest;
    }

    sql.trim().to_string()
}
