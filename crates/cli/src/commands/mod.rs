//! Command handlers for the TIF Agent CLI.
//!
//! Shared builders wire the delegate, stores and prompts for every
//! command.

pub mod ask;
pub mod chat;
pub mod index;
pub mod load;
pub mod prompts;
pub mod schema;
pub mod sql;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use index::IndexCommand;
pub use load::LoadCommand;
pub use prompts::PromptsCommand;
pub use schema::SchemaCommand;
pub use sql::SqlCommand;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tif_agent::{CapabilityDispatcher, QueryTranslator, ResultNarrator, TifAgent};
use tif_core::{config::AppConfig, AppError, AppResult};
use tif_data::SqliteStore;
use tif_knowledge::{
    config as base_config, create_provider, DocumentIndex, RagIndex, UnavailableIndex,
};
use tif_llm::{create_client, LlmClient};
use tif_prompt::{build_prompt, load_prompt, AGENT_SYSTEM, SQL_NARRATE};

/// Create the delegate client for the active provider.
pub fn llm_client(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    let endpoint = config.resolve_endpoint();
    let api_key = config.resolve_api_key(&config.provider);

    create_client(
        &config.provider,
        endpoint.as_deref(),
        api_key.as_deref(),
        config.resolve_timeout(),
    )
    .map_err(AppError::Config)
}

/// Open the local database; the expenditure table must already be loaded.
pub fn open_store(config: &AppConfig) -> AppResult<SqliteStore> {
    let db_path = config.database_path();
    let store = SqliteStore::open(&db_path)?;

    if !store.table_exists(&config.data.table)? {
        return Err(AppError::Data(format!(
            "Table '{}' is not loaded. Run 'tif load' first.",
            config.data.table
        )));
    }

    tracing::debug!(
        "Table '{}' has {} rows",
        config.data.table,
        store.row_count(&config.data.table)?
    );
    Ok(store)
}

/// Open the document index of the configured base.
pub fn open_documents(config: &AppConfig, llm: Arc<dyn LlmClient>) -> AppResult<RagIndex> {
    RagIndex::existing_index_path(&config.workspace, &config.knowledge.base)?;

    let base = base_config::load_config(&config.workspace, &config.knowledge.base)?;
    let api_key = config.resolve_api_key(&base.provider);
    let embedder = create_provider(
        &base,
        api_key.as_deref(),
        config.resolve_timeout().map(Duration::from_secs),
    )?;

    Ok(RagIndex::open(
        &config.workspace,
        &config.knowledge.base,
        embedder,
        llm,
        config.document_model(),
    )?
    .with_top_k(config.knowledge.top_k as usize))
}

/// The configured document index, or a stand-in whose searches report why
/// it could not be opened. Structured questions keep working without one.
pub fn documents_or_unavailable(
    config: &AppConfig,
    llm: Arc<dyn LlmClient>,
) -> Arc<dyn DocumentIndex> {
    match open_documents(config, llm) {
        Ok(index) => Arc::new(index),
        Err(e) => {
            tracing::warn!("Document search unavailable: {}", e);
            Arc::new(UnavailableIndex::new(e.to_string()))
        }
    }
}

pub fn translator(config: &AppConfig, llm: Arc<dyn LlmClient>) -> QueryTranslator {
    QueryTranslator::new(llm, config.translator_model())
}

pub fn narrator(config: &AppConfig, llm: Arc<dyn LlmClient>) -> AppResult<ResultNarrator> {
    let prompt = load_prompt(&config.workspace, SQL_NARRATE)?;
    Ok(ResultNarrator::new(llm, config.narrator_model(), prompt))
}

/// Wire a complete agent: store, document index, translator, narrator and
/// the orchestrating delegate.
pub fn build_agent(config: &AppConfig) -> AppResult<TifAgent> {
    let llm = llm_client(config)?;

    let store = Arc::new(open_store(config)?);
    let documents = documents_or_unavailable(config, Arc::clone(&llm));

    let dispatcher = CapabilityDispatcher::new(
        store,
        &config.data.table,
        documents,
        translator(config, Arc::clone(&llm)),
        narrator(config, Arc::clone(&llm))?,
    )?;

    let system_prompt = build_prompt(&load_prompt(&config.workspace, AGENT_SYSTEM)?, HashMap::new())?;

    tracing::debug!(
        "Agent ready (model: {}, max steps: {})",
        config.model,
        config.agent.max_steps
    );

    Ok(TifAgent::new(llm, &config.model, system_prompt.user, dispatcher)
        .with_max_steps(config.agent.max_steps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn workspace_config(temp: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.workspace = temp.path().to_path_buf();
        config
    }

    #[test]
    fn test_open_store_requires_loaded_table() {
        let temp = TempDir::new().unwrap();
        let config = workspace_config(&temp);

        let err = open_store(&config).err().unwrap();
        assert!(err.to_string().contains("Run 'tif load' first"));
    }

    #[test]
    fn test_open_store_after_load() {
        let temp = TempDir::new().unwrap();
        let config = workspace_config(&temp);

        let csv = temp.path().join("expenditures.csv");
        std::fs::write(
            &csv,
            "TIF District,Report Year,Property Tax Extraction\nKinzie Industrial Corridor,2023,1234567\n",
        )
        .unwrap();

        LoadCommand { csv: Some(csv) }.execute(&config).unwrap();

        let store = open_store(&config).unwrap();
        assert_eq!(store.row_count(&config.data.table).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_index_degrades_to_error_text() {
        let temp = TempDir::new().unwrap();
        let mut config = workspace_config(&temp);
        config.provider = "ollama".to_string();
        let llm = llm_client(&config).unwrap();

        let documents = documents_or_unavailable(&config, llm);

        let err = documents.query("Jefferson Park goals").await.unwrap_err();
        assert!(err.to_string().contains("Run 'tif index' first"));
    }

    #[test]
    fn test_llm_client_rejects_unknown_provider() {
        let temp = TempDir::new().unwrap();
        let mut config = workspace_config(&temp);
        config.provider = "anthropic".to_string();

        assert!(matches!(llm_client(&config), Err(AppError::Config(_))));
    }
}
