//! SQL result to natural-language answer.

use std::collections::HashMap;
use std::sync::Arc;
use tif_core::AppResult;
use tif_data::QueryOutput;
use tif_llm::{LlmClient, LlmRequest};
use tif_prompt::{build_prompt, PromptDefinition};

pub struct ResultNarrator {
    llm: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
}

impl ResultNarrator {
    /// `prompt` is normally the `sql.narrate` definition.
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>, prompt: PromptDefinition) -> Self {
        Self {
            llm,
            model: model.into(),
            prompt,
        }
    }

    /// Phrase `result` as an answer to `question`. Never fails.
    pub async fn narrate(&self, question: &str, query: &str, result: &QueryOutput) -> String {
        match self.try_narrate(question, query, result).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Narration failed: {}", e);
                format!("Error generating humanized response: {}", e)
            }
        }
    }

    async fn try_narrate(
        &self,
        question: &str,
        query: &str,
        result: &QueryOutput,
    ) -> AppResult<String> {
        let mut variables = HashMap::new();
        variables.insert("question".to_string(), question.to_string());
        variables.insert("query".to_string(), query.to_string());
        variables.insert("result".to_string(), result.render_table());

        let built = build_prompt(&self.prompt, variables)?;

        let mut request = LlmRequest::new(built.user, &self.model).with_temperature(0.7);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let response = self.llm.complete(&request).await?;
        Ok(response.content.trim().to_string())
    }
}
