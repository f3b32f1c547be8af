//! LLM integration crate for the TIF agent.
//!
//! This crate provides a provider-agnostic abstraction for talking to the
//! delegate language model: single-prompt completions for the translator,
//! narrator and document synthesis, and tool-calling chat for the
//! orchestration agent.
//!
//! # Providers
//! - **OpenAI**: chat completions API (default)
//! - **Ollama**: local LLM runtime
//!
//! # Example
//! ```no_run
//! use tif_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod chat;
pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use chat::{ChatMessage, ChatRequest, ChatResponse, Role, ToolCall, ToolDefinition};
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::ProviderType;
