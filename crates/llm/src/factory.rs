//! LLM provider factory.
//!
//! Resolves a provider name from configuration into a concrete client.

use std::sync::Arc;
use std::time::Duration;

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient};
use crate::types::ProviderType;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("openai", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key (required for OpenAI)
/// * `timeout` - Optional request timeout in seconds
///
/// # Errors
/// Returns error if the provider is unknown or a required secret is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Option<u64>,
) -> Result<Arc<dyn LlmClient>, String> {
    let provider_type =
        ProviderType::parse(provider).ok_or_else(|| format!("Unknown provider: {}", provider))?;
    let base_url = endpoint.unwrap_or(provider_type.default_endpoint());
    let timeout = timeout.map(Duration::from_secs);

    match provider_type {
        ProviderType::Ollama => {
            let client = OllamaClient::with_base_url(base_url, timeout)?;
            Ok(Arc::new(client))
        }
        ProviderType::OpenAI => {
            let api_key = api_key
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| "OpenAI provider requires API key".to_string())?;
            let client = OpenAiClient::new(base_url, api_key, timeout)?;
            Ok(Arc::new(client))
        }
    }
}
