//! Direct question-to-SQL pipeline, without the orchestrating delegate.

use clap::Args;
use std::sync::Arc;
use tif_agent::is_translation_failure;
use tif_core::{config::AppConfig, AppResult};
use tif_data::{discover_schema, TabularStore};

/// Translate a question to SQL, run it and narrate the result
#[derive(Args, Debug)]
pub struct SqlCommand {
    /// The question to translate
    pub question: String,
}

impl SqlCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing sql command");

        let store = super::open_store(config)?;
        let schema = discover_schema(&store, &config.data.table)?.prompt_context();

        let llm = super::llm_client(config)?;
        let translator = super::translator(config, Arc::clone(&llm));
        let narrator = super::narrator(config, llm)?;

        let sql = translator.translate(&self.question, &schema).await;
        println!("\nGenerated SQL:\n{}", sql);

        if is_translation_failure(&sql) {
            return Ok(());
        }

        let result = match store.execute(&sql) {
            Ok(result) => result,
            Err(e) => {
                println!("Error executing SQL query: {}", e);
                return Ok(());
            }
        };
        println!("Result:\n{}", result.render_table());

        let answer = narrator.narrate(&self.question, &sql, &result).await;
        println!("\nAnswer: {}", answer);

        Ok(())
    }
}
