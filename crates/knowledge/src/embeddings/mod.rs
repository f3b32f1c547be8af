//! Embedding providers for the document index.

pub mod providers;

use crate::types::KnowledgeBaseConfig;
use std::sync::Arc;
use std::time::Duration;
use tif_core::{AppError, AppResult};

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "openai", "ollama")
    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Knowledge("No embedding returned".to_string()))
    }
}

/// Create an embedding provider based on base configuration.
pub fn create_provider(
    config: &KnowledgeBaseConfig,
    api_key: Option<&str>,
    timeout: Option<Duration>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "mock" => Ok(Arc::new(providers::mock::MockProvider::new(
            config.embedding_dim as usize,
        ))),

        "openai" => {
            let api_key = api_key.filter(|k| !k.is_empty()).ok_or_else(|| {
                AppError::Config("OpenAI embeddings require an API key".to_string())
            })?;
            let provider = providers::openai::OpenAiEmbeddingProvider::new(
                config.endpoint.as_deref(),
                api_key,
                &config.model,
                timeout,
            )?;
            Ok(Arc::new(provider))
        }

        "ollama" => {
            let provider = providers::ollama::OllamaEmbeddingProvider::new(
                config.endpoint.as_deref(),
                &config.model,
                timeout,
            )?;
            Ok(Arc::new(provider))
        }

        _ => Err(AppError::Knowledge(format!(
            "Unknown embedding provider: '{}'. Supported providers: mock, openai, ollama",
            config.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str) -> KnowledgeBaseConfig {
        KnowledgeBaseConfig {
            name: "tif".to_string(),
            provider: provider.to_string(),
            embedding_dim: 64,
            ..Default::default()
        }
    }

    #[test]
    fn test_create_mock_provider() {
        let provider = create_provider(&config("mock"), None, None).unwrap();
        assert_eq!(provider.provider_name(), "mock");
        assert_eq!(provider.model_name(), "trigram-v1");
    }

    #[test]
    fn test_openai_requires_key() {
        let err = create_provider(&config("openai"), None, None).unwrap_err();
        assert!(err.to_string().contains("API key"));
        assert!(create_provider(&config("openai"), Some("sk-test"), None).is_ok());
    }

    #[test]
    fn test_create_ollama_provider_without_connecting() {
        let provider = create_provider(&config("ollama"), None, None).unwrap();
        assert_eq!(provider.provider_name(), "ollama");
    }

    #[test]
    fn test_create_unknown_provider() {
        let err = create_provider(&config("gguf"), None, None).unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[tokio::test]
    async fn test_provider_embed_single() {
        let provider = create_provider(&config("mock"), None, None).unwrap();
        let embedding = provider.embed("tax increment").await.unwrap();
        assert_eq!(embedding.len(), 64);
    }
}
