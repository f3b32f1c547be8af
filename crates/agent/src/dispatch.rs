//! Executes parsed capabilities against the backends.

use crate::capability::Capability;
use crate::narrator::ResultNarrator;
use crate::translator::{is_translation_failure, QueryTranslator};
use std::sync::Arc;
use tif_core::AppResult;
use tif_data::{discover_schema, TabularStore};
use tif_knowledge::DocumentIndex;

pub const NO_RESULTS: &str = "No results found in the database.";

/// Runs capabilities. Every capability yields text; backend failures are
/// reported in that text rather than as errors.
pub struct CapabilityDispatcher {
    store: Arc<dyn TabularStore>,
    documents: Arc<dyn DocumentIndex>,
    translator: QueryTranslator,
    narrator: ResultNarrator,
    schema_description: String,
}

impl CapabilityDispatcher {
    /// Build a dispatcher, reading the schema description of `table` once.
    pub fn new(
        store: Arc<dyn TabularStore>,
        table: &str,
        documents: Arc<dyn DocumentIndex>,
        translator: QueryTranslator,
        narrator: ResultNarrator,
    ) -> AppResult<Self> {
        let schema_description = discover_schema(store.as_ref(), table)?.prompt_context();

        Ok(Self {
            store,
            documents,
            translator,
            narrator,
            schema_description,
        })
    }

    pub async fn dispatch(&self, capability: &Capability) -> String {
        tracing::debug!("Dispatching {}", capability.name());

        match capability {
            Capability::FetchSchema => self.schema_description.clone(),
            Capability::RunStructuredQuery(args) => self.run_structured_query(&args.query).await,
            Capability::SearchDocuments(args) => match self.documents.query(&args.query).await {
                Ok(answer) => answer,
                Err(e) => format!("Error searching PDF documents: {}", e),
            },
            // Results reaching the delegate are already readable.
            Capability::Humanize(args) => args.technical_result.clone(),
        }
    }

    /// Translate, execute and narrate one question against the store.
    pub async fn run_structured_query(&self, question: &str) -> String {
        let sql = self
            .translator
            .translate(question, &self.schema_description)
            .await;

        if is_translation_failure(&sql) {
            return format!("Error generating SQL: {}", sql);
        }

        let output = match self.store.execute(&sql) {
            Ok(output) => output,
            Err(e) => return format!("Error executing SQL query: {}", e),
        };

        if output.is_empty() {
            return NO_RESULTS.to_string();
        }

        tracing::debug!("Query returned {} rows", output.row_count());
        self.narrator.narrate(question, &sql, &output).await
    }
}
